use chital_llm::Message;
use chital_persist::ChatMessage;

/// Role/content pairs for the backend, in the order given
pub fn backend_history(messages: &[ChatMessage]) -> Vec<Message> {
    messages
        .iter()
        .map(|m| Message::from_role(m.is_user, m.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_follow_is_user() {
        let messages = vec![ChatMessage::new("Hello", true, 1), ChatMessage::new("Hi", false, 2)];

        let history = backend_history(&messages);

        assert_eq!(history, vec![Message::user("Hello"), Message::assistant("Hi")]);
    }
}
