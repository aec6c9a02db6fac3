use serde::{Deserialize, Serialize};

use crate::ids::ClientId;

/// Frames a client may send over its WebSocket.
///
/// The payload is an opaque string (clients typically carry base64
/// ciphertext); the server applies no validation, size limit, or
/// transformation to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientFrame {
    #[serde(rename = "send-encrypted-message")]
    SendEncryptedMessage {
        #[serde(rename = "encryptedMessage")]
        encrypted_message: String,
    },
}

/// Frames the server pushes to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerFrame {
    /// A relayed payload, tagged with the originating client's id.
    #[serde(rename = "receive-encrypted-message")]
    ReceiveEncryptedMessage {
        #[serde(rename = "senderId")]
        sender_id: ClientId,
        #[serde(rename = "encryptedMessage")]
        encrypted_message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_parses_wire_json() {
        let json = r#"{"event":"send-encrypted-message","encryptedMessage":"aGVsbG8="}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        let ClientFrame::SendEncryptedMessage { encrypted_message } = frame;
        assert_eq!(encrypted_message, "aGVsbG8=");
    }

    #[test]
    fn client_frame_rejects_unknown_event() {
        let json = r#"{"event":"shutdown","encryptedMessage":"x"}"#;
        assert!(serde_json::from_str::<ClientFrame>(json).is_err());
    }

    #[test]
    fn client_frame_rejects_missing_payload() {
        let json = r#"{"event":"send-encrypted-message"}"#;
        assert!(serde_json::from_str::<ClientFrame>(json).is_err());
    }

    #[test]
    fn server_frame_wire_shape() {
        let frame = ServerFrame::ReceiveEncryptedMessage {
            sender_id: ClientId::from_raw("client_abc"),
            encrypted_message: "aGVsbG8=".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "receive-encrypted-message");
        assert_eq!(json["senderId"], "client_abc");
        assert_eq!(json["encryptedMessage"], "aGVsbG8=");
    }

    #[test]
    fn payload_passes_through_untouched() {
        // Not base64 and not printable; the relay must not care.
        let weird = "{\"nested\":\"json\"}\u{1F512} spaces\tand\nnewlines";
        let frame = ServerFrame::ReceiveEncryptedMessage {
            sender_id: ClientId::new(),
            encrypted_message: weird.into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        let parsed: ServerFrame = serde_json::from_str(&json).unwrap();
        let ServerFrame::ReceiveEncryptedMessage {
            encrypted_message, ..
        } = parsed;
        assert_eq!(encrypted_message, weird);
    }
}
