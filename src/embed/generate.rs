use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use super::EmbeddingService;

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub document_id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenerationEvent {
    Embedded {
        document_id: String,
        vector: Vec<f32>,
    },
    Failed {
        document_id: String,
        error: String,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

/// Embeds each request in order, pausing `delay` between remote calls.
///
/// `emit` returning `false` means nobody is listening any more; the run stops
/// without emitting `Finished`.
pub fn run_generation(
    service: &dyn EmbeddingService,
    requests: Vec<GenerationRequest>,
    delay: Duration,
    mut emit: impl FnMut(GenerationEvent) -> bool,
) {
    let total = requests.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut called_remote = false;

    tracing::info!(total, "starting embedding generation");

    for request in requests {
        if request.text.trim().is_empty() {
            failed += 1;
            let event = GenerationEvent::Failed {
                document_id: request.document_id,
                error: "document has no text to embed".to_owned(),
            };
            if !emit(event) {
                return;
            }
            continue;
        }

        if called_remote && !delay.is_zero() {
            thread::sleep(delay);
        }
        called_remote = true;

        let vector = match service.compute_embedding(&request.text) {
            Ok(vector) => vector,
            Err(error) => {
                tracing::warn!(document = %request.document_id, %error, "embedding failed");
                failed += 1;
                let event = GenerationEvent::Failed {
                    document_id: request.document_id,
                    error: error.to_string(),
                };
                if !emit(event) {
                    return;
                }
                continue;
            }
        };

        let remote_error = if service.persists_remotely() {
            service
                .persist_embedding(&request.document_id, &vector)
                .err()
        } else {
            None
        };

        let document_id = request.document_id;
        if !emit(GenerationEvent::Embedded {
            document_id: document_id.clone(),
            vector,
        }) {
            return;
        }

        if let Some(error) = remote_error {
            tracing::warn!(document = %document_id, %error, "remote persistence failed");
            failed += 1;
            if !emit(GenerationEvent::Failed {
                document_id,
                error: format!("remote store: {error}"),
            }) {
                return;
            }
        } else {
            succeeded += 1;
        }
    }

    tracing::info!(succeeded, failed, "embedding generation finished");
    emit(GenerationEvent::Finished { succeeded, failed });
}

/// Runs [`run_generation`] on a worker thread; dropping the receiver abandons the run.
pub fn spawn_generation(
    service: Arc<dyn EmbeddingService>,
    requests: Vec<GenerationRequest>,
    delay: Duration,
) -> Receiver<GenerationEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        run_generation(service.as_ref(), requests, delay, |event| tx.send(event).is_ok());
    });

    rx
}
