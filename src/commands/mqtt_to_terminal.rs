use anyhow::Result;
use direwolf_monitor::config::SubscribeSettings;
use direwolf_monitor::geo::GeoFix;
use direwolf_monitor::mqtt_bridge::{BrokerEvent, BrokerSession};
use direwolf_monitor::pipeline::summarize_line;
use direwolf_monitor::surface::{OutputSurface, PlainSurface, TerminalSurface};
use direwolf_monitor::symbols::SymbolSheets;
use tracing::{info, trace, warn};

/// Subscribe to the topic and render every packet line that arrives
#[tracing::instrument(skip(settings), fields(topic = %settings.broker.topic))]
pub async fn handle_mqtt_to_terminal(settings: SubscribeSettings, plain: bool) -> Result<()> {
    let sheets = SymbolSheets::load(&settings.primary_sheet, &settings.secondary_sheet)?;
    let mut surface: Box<dyn OutputSurface> = if plain {
        Box::new(PlainSurface::new(std::io::stdout()))
    } else {
        Box::new(TerminalSurface::new(std::io::stdout(), sheets))
    };

    match settings.reference {
        Some(fix) => info!(
            "Reference location {:.4}, {:.4}",
            fix.latitude, fix.longitude
        ),
        None => info!("No reference location, distances disabled"),
    }

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
            event = session.next_event() => match event? {
                // Clean sessions forget subscriptions, so subscribe on every connect
                BrokerEvent::Connected => {
                    if let Err(e) = session.subscribe().await {
                        warn!("{:#}", e);
                    }
                }
                BrokerEvent::Message { topic, payload } => {
                    trace!("Message on {} ({} bytes)", topic, payload.len());
                    render_message(surface.as_mut(), &payload, settings.reference)?;
                }
                BrokerEvent::Disconnected { .. } | BrokerEvent::Rejected { .. } => {}
            }
        }
    }
}

/// Returns whether anything was printed
fn render_message(
    surface: &mut dyn OutputSurface,
    payload: &[u8],
    reference: Option<GeoFix>,
) -> Result<bool> {
    let line = String::from_utf8_lossy(payload);
    let Some(summary) = summarize_line(&line, reference) else {
        return Ok(false);
    };
    surface.emit(&summary)?;
    metrics::counter!("dwm.terminal.summaries_rendered_total").increment(1);
    Ok(true)
}
