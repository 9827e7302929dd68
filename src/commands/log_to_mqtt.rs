use anyhow::{Result, bail};
use direwolf_monitor::classifier;
use direwolf_monitor::config::PublishSettings;
use direwolf_monitor::line_follower::{LineFollower, StartPosition};
use direwolf_monitor::mqtt_bridge::{BrokerSession, PublishOutcome};
use tracing::{debug, info, trace};

/// Tail the direwolf log and publish every packet-bearing line to MQTT
#[tracing::instrument(skip(settings), fields(log_file = ?settings.log_file, topic = %settings.broker.topic))]
pub async fn handle_log_to_mqtt(settings: PublishSettings, start: StartPosition) -> Result<()> {
    if !settings.log_file.exists() {
        bail!("Direwolf log file {:?} does not exist", settings.log_file);
    }

    let mut follower = LineFollower::open(&settings.log_file, start)
        .await?
        .with_poll_interval(settings.poll_interval);
    info!(
        "Tailing {:?} ({:?}) into mqtt://{}:{}/{}",
        follower.path(),
        start,
        settings.broker.host,
        settings.broker.port,
        settings.broker.topic
    );

    let mut session = BrokerSession::connect(settings.broker);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, disconnecting from MQTT broker");
                session.disconnect().await;
                return Ok(());
            }
            event = session.next_event() => {
                // Session state is tracked inside the session; inbound messages are not expected
                event?;
            }
            line = follower.next_line() => {
                forward_line(&mut session, &line?).await?;
            }
        }
    }
}

/// Publish `line` when it carries a packet
async fn forward_line(session: &mut BrokerSession, line: &str) -> Result<Option<PublishOutcome>> {
    let classified = classifier::classify(line);
    if !classified.is_forwarded() {
        trace!("Skipping {} line: {}", classified.category.as_str(), line.trim_end());
        metrics::counter!("dwm.publish.lines_skipped_total").increment(1);
        return Ok(None);
    }

    debug!("{}: {}", classified.category.as_str(), line.trim_end());
    session.publish_line(line).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use direwolf_monitor::mqtt_bridge::BrokerConfigBuilder;

    fn offline_session() -> BrokerSession {
        BrokerSession::connect(
            BrokerConfigBuilder::new()
                .host("127.0.0.1")
                .port(1)
                .client_id("direwolf-monitor-test")
                .build(),
        )
    }

    #[tokio::test]
    async fn test_noise_is_not_published() {
        let mut session = offline_session();
        let outcome = forward_line(&mut session, "Dire Wolf version 1.7\n")
            .await
            .unwrap();
        assert_eq!(outcome, None);

        let outcome = forward_line(&mut session, "[rx>ig] #\n").await.unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn test_packet_line_dropped_while_offline() {
        let mut session = offline_session();
        let outcome = forward_line(&mut session, "[0L] N0CALL>APRS:>hello\n")
            .await
            .unwrap();
        assert_eq!(outcome, Some(PublishOutcome::Dropped));
    }

    #[tokio::test]
    async fn test_missing_log_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PublishSettings {
            broker: BrokerConfigBuilder::new().host("127.0.0.1").port(1).build(),
            log_file: dir.path().join("direwolf.log"),
            poll_interval: std::time::Duration::from_millis(10),
        };
        assert!(
            handle_log_to_mqtt(settings, StartPosition::End)
                .await
                .is_err()
        );
    }
}
