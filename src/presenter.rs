use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::runtime::SpanEvent;
use crate::session::Event;
use crate::speech::{SpeechError, Speaker, Voice};

/// A digit trial waiting to be spoken
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub generation: u64,
    pub symbols: Vec<char>,
    pub voice: Voice,
    pub pause: Duration,
}

/// Speaks every symbol in order, pausing after each one.
///
/// `on_symbol` runs after each symbol is spoken; `sleep` is the pause
/// implementation so callers can substitute a clock.
pub fn present<S, F>(
    speaker: &dyn Speaker,
    presentation: &Presentation,
    mut on_symbol: F,
    sleep: S,
) -> Result<(), SpeechError>
where
    F: FnMut(usize),
    S: Fn(Duration),
{
    for (idx, symbol) in presentation.symbols.iter().enumerate() {
        speaker.speak(&symbol.to_string(), presentation.voice.command_name())?;
        on_symbol(idx);
        sleep(presentation.pause);
    }
    Ok(())
}

/// Runs a presentation on a worker thread, reporting back through `tx`
pub fn spawn_presentation(
    speaker: Arc<dyn Speaker>,
    presentation: Presentation,
    tx: Sender<SpanEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let generation = presentation.generation;
        let progress = tx.clone();
        let outcome = present(
            speaker.as_ref(),
            &presentation,
            |_| {
                let _ = progress.send(SpanEvent::Session(Event::SymbolPresented { generation }));
            },
            thread::sleep,
        );

        let event = match outcome {
            Ok(()) => {
                info!(generation, symbols = presentation.symbols.len(), "presentation complete");
                Event::PresentationComplete { generation }
            }
            Err(err) => {
                warn!(generation, error = %err, "presentation failed");
                Event::PresentationFailed {
                    generation,
                    reason: err.to_string(),
                }
            }
        };
        // the loop may already be gone if the user quit mid-presentation
        let _ = tx.send(SpanEvent::Session(event));
    })
}
