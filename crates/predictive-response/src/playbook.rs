//! Canned responses, objections and approaches per stage and user type.

use serde::{Deserialize, Serialize};

/// Where the user is in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// First message, nothing known yet.
    Discovery,
    Awareness,
    Interest,
    Consideration,
    /// Ready to buy or book.
    Intent,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Discovery => "discovery",
            ConversationStage::Awareness => "awareness",
            ConversationStage::Interest => "interest",
            ConversationStage::Consideration => "consideration",
            ConversationStage::Intent => "intent",
        }
    }
}

/// Canned guidance for one stage or user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Play {
    pub responses: &'static [&'static str],
    pub objections: &'static [&'static str],
    pub approach: &'static str,
}

pub fn stage_play(stage: ConversationStage) -> Play {
    match stage {
        ConversationStage::Discovery => Play {
            responses: &[
                "Asks what services are available",
                "Describes what they need help with",
                "Requests the main menu",
            ],
            objections: &["Unsure what the service offers"],
            approach: "Welcome warmly and present the main menu options",
        },
        ConversationStage::Awareness => Play {
            responses: &[
                "Asks for more information",
                "Compares with their current option",
                "Stops replying",
            ],
            objections: &["Does not see the need right now"],
            approach: "Explain the key benefit in one short message",
        },
        ConversationStage::Interest => Play {
            responses: &[
                "Asks how it works",
                "Asks about availability",
                "Requests an example",
            ],
            objections: &["Worried it is too complicated"],
            approach: "Answer questions directly and offer a guided next step",
        },
        ConversationStage::Consideration => Play {
            responses: &[
                "Asks about the price",
                "Tries to negotiate",
                "Asks for alternatives",
            ],
            objections: &["Price is too high", "Timing is not right"],
            approach: "Address concerns with concrete value and flexible options",
        },
        ConversationStage::Intent => Play {
            responses: &[
                "Confirms the order or booking",
                "Asks for payment details",
                "Requests a confirmation message",
            ],
            objections: &["Unsure about the payment method"],
            approach: "Make completion easy by sending payment or booking steps immediately",
        },
    }
}

/// Phrasing for known user-type tags.
pub fn user_type_play(user_type: &str) -> Option<Play> {
    match user_type {
        "driver" => Some(Play {
            responses: &[
                "Asks about ride requests nearby",
                "Updates availability status",
                "Asks about earnings",
            ],
            objections: &["Fuel costs are too high", "Too busy on the road to reply"],
            approach: "keep messages short and action-oriented for drivers on the move",
        }),
        "bar_owner" => Some(Play {
            responses: &[
                "Asks about stock orders",
                "Asks about collecting payments",
                "Requests a menu update",
            ],
            objections: &["Busy during service hours", "Supplier prices are too high"],
            approach: "reach out outside peak hours with concise business value",
        }),
        "vendor" => Some(Play {
            responses: &[
                "Asks about listing products",
                "Asks about customer orders",
                "Asks about payouts",
            ],
            objections: &["Commission is too high", "Not enough customers"],
            approach: "highlight sales opportunities and fast payouts",
        }),
        _ => None,
    }
}

/// Guidance for a stage, rephrased for the user type when it is known.
pub fn guidance(stage: ConversationStage, user_type: Option<&str>) -> (Vec<String>, Vec<String>, String) {
    let base = stage_play(stage);
    let to_owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    match user_type.and_then(user_type_play) {
        Some(play) => {
            let mut objections = to_owned(play.objections);
            for objection in base.objections {
                if !objections.iter().any(|existing| existing == objection) {
                    objections.push(objection.to_string());
                }
            }
            (
                to_owned(play.responses),
                objections,
                format!("{}; {}", base.approach, play.approach),
            )
        }
        None => (
            to_owned(base.responses),
            to_owned(base.objections),
            base.approach.to_string(),
        ),
    }
}
