//! Clients built from a config file

use std::io::Write;
use std::time::Duration;

use retro::{DedupPolicy, Retro, RetroConfig};
use tempfile::NamedTempFile;

use crate::common::{VALUES_RESULT, start_narrative_server};

#[tokio::test]
async fn client_from_config_file_talks_to_configured_server() {
    let server = start_narrative_server().await;
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[http]
base_url = "{}"
timeout_ms = 2000

[retry]
max_retries = 0

[channel]
dedup = "independent"
request_timeout_ms = 1500
"#,
        server.uri()
    )
    .unwrap();

    let resolved = RetroConfig::load_from(file.path())
        .unwrap()
        .expect("config file exists")
        .resolve()
        .unwrap();
    assert_eq!(resolved.http.timeout, Duration::from_secs(2));
    assert_eq!(resolved.channel.dedup, DedupPolicy::Independent);

    let channel = Retro::from_config(&resolved).unwrap().channel();
    assert_eq!(channel.options().request_timeout, Some(Duration::from_millis(1500)));
    assert_eq!(channel.get_str("values").read().await.unwrap(), VALUES_RESULT);
}
