//! Offline generator used when `USE_MOCK=1` and in tests.
//!
//! Answers with canned payloads, guessing from the prompt whether an ingest
//! schema or a generated document is wanted. Tests can script exact replies.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;

use super::ai_client::ChatMessage;

#[derive(Debug, Default)]
struct CallLog {
    count: usize,
    #[cfg_attr(not(test), allow(dead_code))]
    last: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct MockClient {
    scripted: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<CallLog>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that returns the given replies in order before falling back to
    /// the canned payloads.
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        mock.scripted.lock().extend(replies.into_iter().map(Into::into));
        mock
    }

    /// Number of completions served so far.
    #[cfg(test)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().count
    }

    /// Messages of the most recent completion.
    #[cfg(test)]
    pub fn last_messages(&self) -> Option<Vec<ChatMessage>> {
        let calls = self.calls.lock();
        (calls.count > 0).then(|| calls.last.clone())
    }

    pub fn chat(&self, messages: &[ChatMessage]) -> String {
        let call = {
            let mut calls = self.calls.lock();
            calls.count += 1;
            calls.last = messages.to_vec();
            calls.count
        };

        if let Some(reply) = self.scripted.lock().pop_front() {
            tracing::debug!(call, "Serving scripted mock completion");
            return reply;
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if wants_document(prompt) {
            document_payload()
        } else {
            schema_payload()
        }
    }
}

fn wants_document(prompt: &str) -> bool {
    prompt.contains("\"open_questions\"")
        || prompt.contains("\"summary\"")
        || prompt.contains("PROJECT SUMMARY")
        || prompt.contains("PROJECT TASKS")
}

fn document_payload() -> String {
    json!({
        "summary": format!(
            "PROJECT SUMMARY\nMock summary generated at {}.",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
        ),
        "tasks": "PROJECT TASKS\n- Do a thing\n- Do another thing",
        "open_questions": ["Any change approvals required?", "Out-of-hours constraints?"],
    })
    .to_string()
}

fn schema_payload() -> String {
    json!({
        "client": "Mock Client",
        "project_name": "",
        "service": "Installation",
        "scope": "Rack & Stack",
        "environment": "On-prem",
        "timeline": "2 weeks",
        "sites": [{"name": "HQ", "address": "1 Main St"}],
        "bom": [{"type": "AP", "model": "AP64", "qty": 6, "notes": ""}],
        "staging": {"ic_used": false, "doa": false, "burn_in": false, "labelling": "", "packing": ""},
        "rollout": {"waves": "", "floors": "", "ooh_windows": "", "change_approvals": ""},
        "governance": {"pm": "", "comms_channels": "", "escalation": ""},
        "visits_caps": {"install_max_visits": null, "post_deploy_max_visits": null, "site_survey_window_weeks": null},
        "counts": {"aps_ordered": null, "aps_to_mount": null, "devices_total": null},
        "wave_plan": [{"phase": "", "floor": "", "allocations": [{"model": "", "qty": 0}]}],
        "prerequisites": [],
        "assumptions": [],
        "out_of_scope": [],
        "handover": {"docs": "", "acceptance_criteria": ""},
        "constraints": [],
        "deliverables": []
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replies_come_first() {
        let mock = MockClient::scripted(["one", "two"]);
        let msgs = [ChatMessage::user("anything")];
        assert_eq!(mock.chat(&msgs), "one");
        assert_eq!(mock.chat(&msgs), "two");
        assert!(mock.chat(&msgs).contains("Mock Client"));
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn document_prompt_gets_document_payload() {
        let mock = MockClient::new();
        let out = mock.chat(&[
            ChatMessage::system("sys"),
            ChatMessage::user("Return keys \"summary\" and \"open_questions\""),
        ]);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(v["summary"].as_str().unwrap().starts_with("PROJECT SUMMARY"));
        assert_eq!(v["open_questions"].as_array().unwrap().len(), 2);
        assert_eq!(mock.last_messages().unwrap().len(), 2);
    }

    #[test]
    fn other_prompts_get_schema_payload() {
        let out = MockClient::new().chat(&[ChatMessage::user("Rack 6 APs at HQ")]);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["client"], "Mock Client");
        assert_eq!(v["bom"][0]["model"], "AP64");
    }
}
