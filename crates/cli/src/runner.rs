//! Option merging and operation dispatch.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use ezbak_archive::Compression;
use ezbak_core::{
    config_path, infer_archive_format, install_signal_handler, load_config, run_backup,
    run_restore, store_config, Error, Options, RestoreRequest,
};
use ezbak_crypt::CipherSpec;

use crate::args::{BackupArgs, Cli, Command, RestoreArgs};
use crate::observer::ConsoleObserver;

/// Parses `args` and executes the selected operation, returning the process
/// exit code.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            // Help and version render through clap's "error" path but exit 0.
            let code = i32::from(error.use_stderr());
            let _ = error.print();
            return code;
        }
    };

    install_signal_handler();

    let result = match cli.command {
        Command::Backup(args) => {
            init_tracing(args.verbose);
            command_backup(&args)
        }
        Command::Restore(args) => {
            init_tracing(args.verbose);
            command_restore(&args)
        }
        Command::Configure(args) => {
            init_tracing(args.verbose);
            command_configure(&args)
        }
    };

    match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("ezbak: {error}");
            error.exit_code().as_i32()
        }
    }
}

/// Clamps an exit code into the range the OS can report.
#[must_use]
pub fn exit_code_from(code: i32) -> std::process::ExitCode {
    std::process::ExitCode::from(u8::try_from(code.clamp(0, 255)).unwrap_or(u8::MAX))
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn command_backup(args: &BackupArgs) -> Result<(), Error> {
    let config_file = config_path()?;
    let base = load_config(&config_file)?.unwrap_or_default();
    let mut options = apply_overrides(base, args)?;

    let mut observer = ConsoleObserver::new(options.verbose, args.quiet);
    let summary = run_backup(&mut options, Some(&config_file), &mut observer)?;
    drop(observer);

    if !args.quiet {
        println!("Backup written to {}", summary.archive_path.display());
        println!(
            "  {} files scanned, {} added, {} unchanged, {} removed since last run",
            summary.files_seen, summary.files_ingested, summary.files_unchanged, summary.removed
        );
        if summary.warnings > 0 {
            eprintln!("  {} warnings, see log output above", summary.warnings);
        }
    }
    Ok(())
}

fn command_restore(args: &RestoreArgs) -> Result<(), Error> {
    let archive = match &args.archive {
        Some(archive) => archive.clone(),
        None => {
            let config_file = config_path()?;
            load_config(&config_file)?
                .and_then(|options| options.prev_backup)
                .ok_or_else(|| {
                    Error::config("no archive given and no previous backup recorded")
                })?
        }
    };

    let (inferred_cipher, inferred_compression) = infer_archive_format(&archive);
    let cipher = match &args.encryption {
        Some(name) if name.eq_ignore_ascii_case("none") => None,
        Some(name) => Some(parse_cipher(name)?),
        None => inferred_cipher,
    };
    let compression = match &args.compressor {
        Some(name) => parse_compression(name)?,
        None => inferred_compression,
    };

    let request = RestoreRequest {
        archive,
        output_directory: args.output.clone(),
        cipher,
        compression,
        password: args.password.clone(),
    };
    let mut observer = ConsoleObserver::new(args.verbose, args.quiet);
    let restored = run_restore(&request, &mut observer)?;
    drop(observer);

    if !args.quiet {
        println!(
            "Restored {restored} files to {}",
            request.output_directory.display()
        );
    }
    Ok(())
}

fn command_configure(args: &BackupArgs) -> Result<(), Error> {
    let config_file = config_path()?;
    let base = load_config(&config_file)?.unwrap_or_default();
    let options = apply_overrides(base, args)?;
    store_config(&config_file, &options)?;

    println!("Configuration written to {}", config_file.display());
    print_options(&options);
    Ok(())
}

fn print_options(options: &Options) {
    let list = |paths: &[PathBuf]| {
        if paths.is_empty() {
            "(none)".to_string()
        } else {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    };
    println!("  directories: {}", list(&options.directories));
    println!("  exclude:     {}", list(&options.exclusions));
    println!("  checksum:    {}", options.hash_algorithm);
    println!(
        "  encryption:  {}",
        options.cipher.map_or("none".to_string(), |c| c.to_string())
    );
    println!(
        "  compressor:  {}{}",
        options.compression,
        options
            .compression_level
            .map_or(String::new(), |l| format!(" (level {l})"))
    );
    println!(
        "  output:      {}",
        options
            .output_directory
            .as_ref()
            .map_or("$HOME/Backups".to_string(), |p| p.display().to_string())
    );
    println!(
        "  previous:    {}",
        options
            .prev_backup
            .as_ref()
            .map_or("(none)".to_string(), |p| p.display().to_string())
    );
}

fn apply_overrides(mut options: Options, args: &BackupArgs) -> Result<Options, Error> {
    if let Some(compressor) = &args.compressor {
        options.compression = parse_compression(compressor)?;
    }
    if let Some(checksum) = &args.checksum {
        options.hash_algorithm = checksum
            .parse()
            .map_err(|error| Error::config(format!("{error}")))?;
    }
    if let Some(encryption) = &args.encryption {
        options.cipher = if encryption.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_cipher(encryption)?)
        };
    }
    if !args.directories.is_empty() {
        options.directories = args.directories.clone();
    }
    if !args.exclude.is_empty() {
        options.exclusions = args.exclude.clone();
    }
    if let Some(output) = &args.output {
        options.output_directory = Some(output.clone());
    }
    if let Some(password) = &args.password {
        options.password = Some(password.clone());
    }
    if let Some(level) = args.level {
        // Level 0 means "codec default" on the command line; the writer
        // never sees the sentinel.
        options.compression_level = (level != 0).then_some(level);
    }
    if args.verbose {
        options.verbose = true;
    }
    if args.quiet {
        options.verbose = false;
    }
    Ok(options)
}

fn parse_compression(name: &str) -> Result<Compression, Error> {
    name.parse()
        .map_err(|error| Error::config(format!("{error}")))
}

fn parse_cipher(name: &str) -> Result<CipherSpec, Error> {
    name.parse()
        .map_err(|error| Error::config(format!("{error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezbak_checksums::HashAlgorithm;

    fn backup_args() -> BackupArgs {
        BackupArgs {
            compressor: None,
            checksum: None,
            directories: Vec::new(),
            encryption: None,
            output: None,
            password: None,
            exclude: Vec::new(),
            level: None,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let args = BackupArgs {
            compressor: Some("xz".to_string()),
            checksum: Some("sha512".to_string()),
            encryption: Some("aes-128-cbc".to_string()),
            directories: vec![PathBuf::from("/srv")],
            level: Some(9),
            verbose: true,
            ..backup_args()
        };
        let options = apply_overrides(Options::default(), &args).expect("apply");
        assert_eq!(options.compression, Compression::Xz);
        assert_eq!(options.hash_algorithm, HashAlgorithm::Sha512);
        assert_eq!(options.cipher, Some(CipherSpec::Aes128Cbc));
        assert_eq!(options.directories, vec![PathBuf::from("/srv")]);
        assert_eq!(options.compression_level, Some(9));
        assert!(options.verbose);
    }

    #[test]
    fn level_zero_means_codec_default() {
        let args = BackupArgs {
            level: Some(0),
            ..backup_args()
        };
        let options = apply_overrides(Options::default(), &args).expect("apply");
        assert_eq!(options.compression_level, None);
    }

    #[test]
    fn encryption_none_disables_a_configured_cipher() {
        let configured = Options {
            cipher: Some(CipherSpec::Aes256Cbc),
            ..Options::default()
        };
        let args = BackupArgs {
            encryption: Some("none".to_string()),
            ..backup_args()
        };
        let options = apply_overrides(configured, &args).expect("apply");
        assert_eq!(options.cipher, None);
    }

    #[test]
    fn unknown_names_are_config_errors() {
        let args = BackupArgs {
            checksum: Some("blake3".to_string()),
            ..backup_args()
        };
        assert!(matches!(
            apply_overrides(Options::default(), &args),
            Err(Error::Config { .. })
        ));

        let args = BackupArgs {
            compressor: Some("zstd".to_string()),
            ..backup_args()
        };
        assert!(matches!(
            apply_overrides(Options::default(), &args),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn exit_codes_clamp_into_u8_range() {
        // std's ExitCode is opaque; its Debug form carries the value.
        let render = |code: i32| format!("{:?}", exit_code_from(code));
        assert_eq!(render(-5), format!("{:?}", std::process::ExitCode::from(0)));
        assert_eq!(render(0), format!("{:?}", std::process::ExitCode::from(0)));
        assert_eq!(render(42), format!("{:?}", std::process::ExitCode::from(42)));
        assert_eq!(render(1000), format!("{:?}", std::process::ExitCode::from(255)));
    }

    #[test]
    fn version_flag_exits_zero() {
        assert_eq!(run(["ezbak", "--version"]), 0);
    }

    #[test]
    fn missing_operation_exits_nonzero() {
        assert_ne!(run(["ezbak"]), 0);
    }
}
