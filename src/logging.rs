use tracing_subscriber::EnvFilter;

/// Default filter for a `-v` count when RUST_LOG is unset
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "repo_digest=info,tower_http=warn",
        1 => "repo_digest=debug,tower_http=info",
        _ => "repo_digest=trace,tower_http=debug",
    }
}

/// Install the global tracing subscriber. Logs go to stderr so the analyze
/// command can keep stdout for its result.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Writer that keeps everything logged in memory
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_default_directives() {
        assert!(default_directive(0).contains("info"));
        assert!(default_directive(1).contains("debug"));
        assert!(default_directive(5).contains("trace"));
    }

    #[tokio::test]
    async fn test_readme_failure_is_logged_as_warning() {
        use crate::github::fetch::GithubClient;
        use crate::github::RepoReference;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/foo/bar"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/foo/bar/readme"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = GithubClient::new(server.uri()).unwrap();
        let data = client
            .fetch(&RepoReference::new("foo", "bar").unwrap())
            .await
            .unwrap();
        assert!(data.readme.is_empty());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("README not available"));
        assert!(logs.contains("status=500"));
    }
}
