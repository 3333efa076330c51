use crate::api::ProjectDetails;
use serde::Serialize;
use tokio::sync::mpsc;

/// Where the dashboard goes once a top-up is confirmed
pub const WORKSPACE_ROUTE: &str = "/workspace?fromLocalStorage=true";

/// Events emitted while watching a processing job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProjectEvent {
    /// Non-terminal status observed
    #[serde(rename_all = "camelCase")]
    Step {
        raw_status: String,
        step_index: usize,
        step_label: &'static str,
        step_count: usize,
    },

    /// Details fetched and cached; the caller should open the details view
    Completed { details: ProjectDetails },

    Failed { message: String },
}

/// Events emitted while waiting for purchased credits to land
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CreditEvent {
    /// `credits` is `None` when the profile fetch failed
    #[serde(rename_all = "camelCase")]
    Attempt {
        attempt: u32,
        max_attempts: u32,
        credits: Option<f64>,
    },

    Confirmed { credits: f64 },

    TimedOut { attempts: u32 },

    Redirect { route: String },
}

/// Observer for a project status poll. Implemented for any `FnMut(ProjectEvent)`.
pub trait ProjectListener: Send + 'static {
    fn on_event(&mut self, event: ProjectEvent);
}

impl<F> ProjectListener for F
where
    F: FnMut(ProjectEvent) + Send + 'static,
{
    fn on_event(&mut self, event: ProjectEvent) {
        self(event)
    }
}

/// Observer for a credit confirmation poll. Implemented for any `FnMut(CreditEvent)`.
pub trait CreditListener: Send + 'static {
    fn on_event(&mut self, event: CreditEvent);
}

impl<F> CreditListener for F
where
    F: FnMut(CreditEvent) + Send + 'static,
{
    fn on_event(&mut self, event: CreditEvent) {
        self(event)
    }
}

/// Listener that ignores every event
pub struct NoOpListener;

impl ProjectListener for NoOpListener {
    #[inline(always)]
    fn on_event(&mut self, _event: ProjectEvent) {}
}

impl CreditListener for NoOpListener {
    #[inline(always)]
    fn on_event(&mut self, _event: CreditEvent) {}
}

/// Listener that forwards every event into an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
pub struct ChannelListener<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> ChannelListener<E> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProjectListener for ChannelListener<ProjectEvent> {
    fn on_event(&mut self, event: ProjectEvent) {
        let _ = self.tx.send(event);
    }
}

impl CreditListener for ChannelListener<CreditEvent> {
    fn on_event(&mut self, event: CreditEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let step = ProjectEvent::Step {
            raw_status: "TRANSCRIBING_AUDIO".to_string(),
            step_index: 1,
            step_label: "Transcribing",
            step_count: 3,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "step");
        assert_eq!(json["stepLabel"], "Transcribing");

        let timed_out = serde_json::to_value(CreditEvent::TimedOut { attempts: 10 }).unwrap();
        assert_eq!(timed_out["type"], "timedOut");
        assert_eq!(timed_out["attempts"], 10);
    }

    #[test]
    fn test_channel_listener_forwards_until_receiver_dropped() {
        let (mut listener, mut rx) = ChannelListener::<CreditEvent>::new();
        CreditListener::on_event(&mut listener, CreditEvent::Confirmed { credits: 150.0 });
        assert_eq!(rx.try_recv().unwrap(), CreditEvent::Confirmed { credits: 150.0 });

        drop(rx);
        CreditListener::on_event(&mut listener, CreditEvent::TimedOut { attempts: 10 });
    }
}
