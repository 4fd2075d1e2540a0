use chital_llm::streaming::{decode_line, ChatChunk};
use chital_llm::StreamEvent;

#[test]
fn test_content_chunk() {
    let events =
        decode_line(br#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#)
            .unwrap();

    assert_eq!(
        events,
        vec![StreamEvent::Message {
            content: "Hel".to_string()
        }]
    );
}

#[test]
fn test_final_chunk_with_content_yields_both_events() {
    let events =
        decode_line(br#"{"message":{"role":"assistant","content":"!"},"done":true,"done_reason":"stop"}"#)
            .unwrap();

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], StreamEvent::Done { finish_reason: Some(r) } if r == "stop"));
}

#[test]
fn test_empty_content_is_not_emitted() {
    let events = decode_line(br#"{"message":{"role":"assistant","content":""},"done":false}"#).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_garbage_line_is_an_error() {
    assert!(decode_line(b"not json").is_err());
}

#[test]
fn test_chunk_accessors() {
    let chunk: ChatChunk =
        serde_json::from_str(r#"{"message":{"role":"assistant","content":"x"},"done":false}"#).unwrap();

    assert_eq!(chunk.content(), Some("x"));
    assert!(!chunk.is_done());
}
