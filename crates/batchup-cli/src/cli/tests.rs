use super::*;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_upload_defaults() {
    match parse(&["batchup", "upload", "a.png", "b.png"]) {
        CliCommand::Upload {
            files,
            jobs,
            endpoint,
            retries,
        } => {
            assert_eq!(files, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
            assert!(jobs.is_none());
            assert!(endpoint.is_none());
            assert_eq!(retries, 0);
        }
        _ => panic!("expected Upload"),
    }
}

#[test]
fn cli_parse_upload_flags() {
    match parse(&[
        "batchup",
        "upload",
        "--jobs",
        "5",
        "--endpoint",
        "http://10.0.0.2:5150/api/upload",
        "--retries",
        "2",
        "x.bin",
    ]) {
        CliCommand::Upload {
            files,
            jobs,
            endpoint,
            retries,
        } => {
            assert_eq!(files, vec![PathBuf::from("x.bin")]);
            assert_eq!(jobs, Some(5));
            assert_eq!(endpoint.as_deref(), Some("http://10.0.0.2:5150/api/upload"));
            assert_eq!(retries, 2);
        }
        _ => panic!("expected Upload with flags"),
    }
}

#[test]
fn cli_upload_requires_files() {
    assert!(Cli::try_parse_from(["batchup", "upload"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["batchup", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}
