//! Tool declarations offered to the remote model

use serde_json::{Value, json};

pub const GET_WEATHER: &str = "get_weather";
pub const SEND_EMAIL: &str = "send_email";
pub const CREATE_CALENDAR_EVENT: &str = "create_calendar_event";

/// Function declarations in the Gemini `functionDeclarations` schema
#[must_use]
pub fn function_declarations() -> Value {
    json!([
        {
            "name": GET_WEATHER,
            "description": "Get the current weather for a specific location.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "location": {
                        "type": "STRING",
                        "description": "The city and state, e.g., San Francisco, CA"
                    }
                },
                "required": ["location"]
            }
        },
        {
            "name": SEND_EMAIL,
            "description": "Send an email to a recipient.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "recipient": {
                        "type": "STRING",
                        "description": "The email address of the recipient."
                    },
                    "subject": {
                        "type": "STRING",
                        "description": "The subject line of the email."
                    },
                    "body": {
                        "type": "STRING",
                        "description": "The content/body of the email."
                    }
                },
                "required": ["recipient", "subject", "body"]
            }
        },
        {
            "name": CREATE_CALENDAR_EVENT,
            "description": "Create a calendar event.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "title": {
                        "type": "STRING",
                        "description": "The title of the event."
                    },
                    "start_time": {
                        "type": "STRING",
                        "description": "The start time of the event in ISO 8601 format."
                    },
                    "end_time": {
                        "type": "STRING",
                        "description": "The end time of the event in ISO 8601 format."
                    },
                    "description": {
                        "type": "STRING",
                        "description": "A brief description of the event."
                    }
                },
                "required": ["title", "start_time", "end_time"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_three_tools() {
        let decls = function_declarations();
        let names: Vec<_> = decls
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, [GET_WEATHER, SEND_EMAIL, CREATE_CALENDAR_EVENT]);
    }

    #[test]
    fn calendar_description_is_optional() {
        let decls = function_declarations();
        let required = &decls[2]["parameters"]["required"];
        assert_eq!(required, &json!(["title", "start_time", "end_time"]));
    }
}
