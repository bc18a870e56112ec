//! The battle vocabulary exchanged between the two players of a session.

use core::fmt;

use crate::common::AttackOutcome;

/// Kind of a battle message. Encoded on the wire as its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "std",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "u8", try_from = "u8")
)]
pub enum MessageType {
    Ready,
    Attack,
    Result,
    /// Sent by the losing side instead of its final `Result`.
    End,
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> u8 {
        match t {
            MessageType::Ready => 0,
            MessageType::Attack => 1,
            MessageType::Result => 2,
            MessageType::End => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessageType(pub u8);

impl fmt::Display for UnknownMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message type {}", self.0)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(MessageType::Ready),
            1 => Ok(MessageType::Attack),
            2 => Ok(MessageType::Result),
            3 => Ok(MessageType::End),
            other => Err(UnknownMessageType(other)),
        }
    }
}

/// One battle message. `Attack` uses `x`/`y`, `Result` uses `hit`/`destroy`;
/// zero and `false` fields are left out of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    #[cfg_attr(feature = "std", serde(rename = "type"))]
    pub kind: MessageType,
    #[cfg_attr(feature = "std", serde(default, skip_serializing_if = "is_zero"))]
    pub x: usize,
    #[cfg_attr(feature = "std", serde(default, skip_serializing_if = "is_zero"))]
    pub y: usize,
    #[cfg_attr(feature = "std", serde(default, skip_serializing_if = "is_false"))]
    pub hit: bool,
    #[cfg_attr(feature = "std", serde(default, skip_serializing_if = "is_false"))]
    pub destroy: bool,
}

#[cfg(feature = "std")]
fn is_zero(v: &usize) -> bool {
    *v == 0
}

#[cfg(feature = "std")]
fn is_false(v: &bool) -> bool {
    !*v
}

impl Message {
    const fn bare(kind: MessageType) -> Self {
        Message {
            kind,
            x: 0,
            y: 0,
            hit: false,
            destroy: false,
        }
    }

    pub const fn ready() -> Self {
        Self::bare(MessageType::Ready)
    }

    pub const fn attack(x: usize, y: usize) -> Self {
        Message {
            x,
            y,
            ..Self::bare(MessageType::Attack)
        }
    }

    pub const fn result(outcome: AttackOutcome) -> Self {
        Message {
            hit: outcome.hit,
            destroy: outcome.destroy,
            ..Self::bare(MessageType::Result)
        }
    }

    pub const fn end() -> Self {
        Self::bare(MessageType::End)
    }

    pub fn outcome(&self) -> AttackOutcome {
        AttackOutcome {
            hit: self.hit,
            destroy: self.destroy,
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn attack_encodes_type_as_ordinal() {
        let json = serde_json::to_string(&Message::attack(3, 7)).unwrap();
        assert_eq!(json, r#"{"type":1,"x":3,"y":7}"#);
        let ready = serde_json::to_string(&Message::ready()).unwrap();
        assert_eq!(ready, r#"{"type":0}"#);
    }

    #[test]
    fn result_decodes_missing_flags_as_false() {
        let msg: Message = serde_json::from_str(r#"{"type":2,"hit":true}"#).unwrap();
        assert_eq!(msg.kind, MessageType::Result);
        assert_eq!(msg.outcome(), AttackOutcome::HIT);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"type":9}"#).is_err());
    }
}
