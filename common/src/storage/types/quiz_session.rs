#![allow(clippy::module_name_repetitions)]
use uuid::Uuid;

use crate::{
    error::AppError, storage::db::SurrealDbClient,
    utils::collection_name::prepare_collection_name, stored_object,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "User"),
            MessageRole::Assistant => write!(f, "Assistant"),
        }
    }
}

// Per-user quiz state that used to live in the UI framework's session.
stored_object!(QuizSession, "quiz_session", {
    filename: Option<String>,
    collection_name: Option<String>,
    #[serde(default)]
    chat_history: Vec<ChatMessage>,
    #[serde(default)]
    previous_questions: Vec<String>,
    current_question: Option<String>,
    generated_answer: Option<String>
});

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            filename: None,
            collection_name: None,
            chat_history: Vec::new(),
            previous_questions: Vec::new(),
            current_question: None,
            generated_answer: None,
        }
    }

    pub async fn get(id: &str, db: &SurrealDbClient) -> Result<Self, AppError> {
        db.get_item::<Self>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    pub async fn save(mut self, db: &SurrealDbClient) -> Result<Self, AppError> {
        self.updated_at = Utc::now();
        let id = self.id.clone();
        db.upsert_item(self)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("session {id} was not persisted")))
    }

    pub fn is_current_file(&self, filename: &str) -> bool {
        self.filename.as_deref() == Some(filename)
    }

    pub fn select_file(&mut self, filename: &str) {
        self.filename = Some(filename.to_string());
        self.collection_name = Some(prepare_collection_name(filename));
    }

    /// Resets the dialogue after a new upload; nothing is selected until the user starts a chat.
    pub fn reset_for_upload(&mut self, uploaded_file: &str) {
        self.chat_history.clear();
        self.previous_questions.clear();
        self.filename = None;
        self.collection_name = Some(prepare_collection_name(uploaded_file));
    }

    pub fn clear_chat(&mut self) {
        self.chat_history.clear();
        self.previous_questions.clear();
    }

    /// Drops the selected file, e.g. after it was deleted.
    pub fn forget_file(&mut self) {
        self.chat_history.clear();
        self.filename = None;
    }

    pub fn record_question(&mut self, question: String, answer: String) {
        self.previous_questions.push(question.clone());
        self.current_question = Some(question);
        self.generated_answer = Some(answer);
    }

    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.chat_history.push(ChatMessage::user(content));
    }

    pub fn push_assistant_message(&mut self, content: impl Into<String>) {
        self.chat_history.push(ChatMessage::assistant(content));
    }

    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.chat_history
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_file_derives_collection_name() {
        let mut session = QuizSession::new();
        session.select_file("Cell biology.docx");

        assert!(session.is_current_file("Cell biology.docx"));
        assert!(!session.is_current_file("Other.docx"));
        assert_eq!(session.collection_name.as_deref(), Some("Cell_biology"));
    }

    #[test]
    fn test_reset_for_upload_clears_dialogue_and_selection() {
        let mut session = QuizSession::new();
        session.select_file("old.docx");
        session.push_assistant_message("Question?");
        session.record_question("Question?".into(), "Answer".into());

        session.reset_for_upload("new file.docx");

        assert!(session.chat_history.is_empty());
        assert!(session.previous_questions.is_empty());
        assert!(session.filename.is_none());
        assert_eq!(session.collection_name.as_deref(), Some("new_file"));
    }

    #[test]
    fn test_forget_file_keeps_previous_questions() {
        let mut session = QuizSession::new();
        session.select_file("doc.docx");
        session.record_question("Q1".into(), "A1".into());
        session.push_assistant_message("Q1");

        session.forget_file();

        assert!(session.filename.is_none());
        assert!(session.chat_history.is_empty());
        assert_eq!(session.previous_questions, vec!["Q1".to_string()]);
    }

    #[test]
    fn test_record_question_and_last_assistant_message() {
        let mut session = QuizSession::new();
        session.record_question("What is ATP?".into(), "Energy currency".into());
        session.push_assistant_message("What is ATP?");
        session.push_user_message("Energy");

        assert_eq!(session.current_question.as_deref(), Some("What is ATP?"));
        assert_eq!(session.generated_answer.as_deref(), Some("Energy currency"));
        assert_eq!(
            session.last_assistant_message().map(|m| m.content.as_str()),
            Some("What is ATP?")
        );
        assert_eq!(format!("{}", MessageRole::Assistant), "Assistant");
    }

    #[test]
    fn test_message_role_wire_format_is_lowercase() {
        let value = serde_json::to_value(ChatMessage::user("Energy")).unwrap();
        assert_eq!(value, serde_json::json!({ "role": "user", "content": "Energy" }));

        let parsed: ChatMessage =
            serde_json::from_value(serde_json::json!({ "role": "assistant", "content": "Hi" }))
                .unwrap();
        assert_eq!(parsed, ChatMessage::assistant("Hi"));
    }

    #[tokio::test]
    async fn test_session_persistence_roundtrip() {
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("test_ns", database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let mut session = QuizSession::new();
        session.select_file("notes.docx");
        session.push_assistant_message("First question?");
        let saved = session.save(&db).await.expect("Failed to save session");

        let fetched = QuizSession::get(&saved.id, &db)
            .await
            .expect("Failed to fetch session");
        assert_eq!(fetched.filename.as_deref(), Some("notes.docx"));
        assert_eq!(fetched.chat_history, vec![ChatMessage::assistant("First question?")]);

        let missing = QuizSession::get("does-not-exist", &db).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
