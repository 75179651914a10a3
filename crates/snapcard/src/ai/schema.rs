use serde_json::{json, Value};

use crate::record::CardType;

/// Response schema constraining model output to `{ cards: [Card] }`.
pub fn card_response_schema() -> Value {
    let card_types: Vec<&str> = CardType::ALL.iter().map(CardType::as_str).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "cards": {
                "type": "ARRAY",
                "description": "Knowledge cards extracted from the image. Create one card per distinct topic.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "description": "CONCEPT (theory/definition), INSIGHT (deep thought), TUTORIAL (how-to), QUOTE (memorable sentence) or FACT (data/news).",
                            "enum": card_types
                        },
                        "title": {
                            "type": "STRING",
                            "description": "A catchy, short title (max 15 chars). Rephrase instead of copying the OCR text."
                        },
                        "summary": {
                            "type": "STRING",
                            "description": "A one-sentence TL;DR summary."
                        },
                        "content": {
                            "type": "STRING",
                            "description": "Main body in simple markdown (bold, lists). Add context or examples that are not in the image."
                        },
                        "tags": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        },
                        "color": {
                            "type": "STRING",
                            "description": "Hex background color matching the mood, e.g. #FEF3C7 for warm insights, #DBEAFE for tech concepts."
                        }
                    },
                    "required": ["type", "title", "summary", "content", "tags", "color"]
                }
            }
        },
        "required": ["cards"]
    })
}
