//! CLI Command Tests
//!
//! Runs the scriptable commands against a mocked lecture server and checks
//! their exit codes. Output goes to stdout/stderr and is not captured here.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use lecture_lens::cli::{Cli, Command};

    #[test]
    fn test_subcommand_aliases() {
        let cli = Cli::parse_from(["lecture-lens", "ls"]);
        assert!(matches!(cli.command, Some(Command::Languages(_))));

        let cli = Cli::parse_from(["lecture-lens", "w", "-l", "en", "-n", "1"]);
        match cli.command {
            Some(Command::Watch(cmd)) => {
                assert_eq!(cmd.language, "en");
                assert_eq!(cmd.max, Some(1));
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::parse_from(["lecture-lens", "current", "-c", "/tmp/lens.toml"]);
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/tmp/lens.toml"))
        );
    }

    #[test]
    fn test_unknown_speech_backend_rejected() {
        assert!(Cli::try_parse_from(["lecture-lens", "--speech", "cloud"]).is_err());
    }
}

// =============================================================================
// Command Tests
// =============================================================================

mod commands {
    use lecture_lens::cli::{CurrentCmd, ExitCode, LanguagesCmd, Output, WatchCmd};
    use lecture_lens::commands::{current_cmd, languages_cmd, watch_cmd};
    use mockito::Server;
    use std::time::Duration;

    fn quiet_json() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    const LANGUAGES: &str = r#"{"languages": {"en": {"name": "English"}, "ko": {"name": "한국어"}}}"#;
    const CURRENT: &str = r#"{"subtitles": {"en": "Hello.", "ko": "안녕하세요."}}"#;

    #[tokio::test]
    async fn test_languages_success() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/languages")
            .with_status(200)
            .with_body(LANGUAGES)
            .create_async()
            .await;

        let code = languages_cmd(LanguagesCmd {}, &server.url(), &quiet_json()).await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_languages_server_error_is_network_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/languages")
            .with_status(500)
            .create_async()
            .await;

        let code = languages_cmd(LanguagesCmd {}, &server.url(), &quiet_json()).await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_current_all_and_single_language() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/current")
            .with_status(200)
            .with_body(CURRENT)
            .expect(2)
            .create_async()
            .await;

        let all = current_cmd(CurrentCmd { language: None }, &server.url(), &quiet_json()).await;
        assert_eq!(all, ExitCode::Success);

        let one = current_cmd(
            CurrentCmd {
                language: Some("ko".into()),
            },
            &server.url(),
            &quiet_json(),
        )
        .await;
        assert_eq!(one, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_current_unknown_language() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/current")
            .with_status(200)
            .with_body(CURRENT)
            .create_async()
            .await;

        let code = current_cmd(
            CurrentCmd {
                language: Some("fr".into()),
            },
            &server.url(),
            &quiet_json(),
        )
        .await;
        assert_eq!(code, ExitCode::LanguageNotOffered);
    }

    #[tokio::test]
    async fn test_current_unreachable_server() {
        let code = current_cmd(
            CurrentCmd { language: None },
            "http://127.0.0.1:1",
            &quiet_json(),
        )
        .await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[test]
    fn test_watch_zero_max_returns_immediately() {
        let cmd = WatchCmd {
            language: "en".into(),
            max: Some(0),
        };
        let code = tokio_test::block_on(watch_cmd(
            cmd,
            "http://127.0.0.1:1",
            Duration::from_secs(1),
            &quiet_json(),
        ));
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn test_watch_rejects_bad_url() {
        let cmd = WatchCmd {
            language: "en".into(),
            max: Some(1),
        };
        let code = tokio_test::block_on(watch_cmd(
            cmd,
            "not a url",
            Duration::from_secs(1),
            &quiet_json(),
        ));
        assert_eq!(code, ExitCode::InvalidArgs);
    }
}
