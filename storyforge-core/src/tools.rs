//! Tool declarations advertised to the model.
//!
//! One [`llm::Tool`] per operation. The schemas mirror what the validator
//! accepts; descriptions carry the hard requirements (length floors, the
//! descriptive-title rule) because models follow schema descriptions far
//! more reliably than prompt prose.

use llm::Tool;
use serde_json::json;

/// Build the full tool set for a story session.
pub fn story_tools() -> Vec<Tool> {
    vec![
        update_structure(),
        add_chapter(),
        update_storyboard(),
        add_character(),
        add_character_behavior(),
        add_world_entry(),
        add_writing_guideline(),
    ]
}

fn update_structure() -> Tool {
    Tool {
        name: "update_structure".into(),
        description: "Update one beat of the story's plot structure. Creates a new version \
                      of that beat; earlier versions are kept."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "beat": {
                    "type": "string",
                    "enum": ["hook", "incitingIncident", "risingAction", "climax", "fallingAction", "resolution"],
                    "description": "Which structural beat to update."
                },
                "content": {
                    "type": "string",
                    "description": "The new text for this beat."
                }
            },
            "required": ["beat", "content"]
        }),
    }
}

fn add_chapter() -> Tool {
    Tool {
        name: "add_chapter".into(),
        description: "Add or update a chapter outline without writing its body. Chapters are \
                      keyed by number (and volume, when volumes are in use)."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "number": {
                    "type": "integer",
                    "description": "Chapter number."
                },
                "title": {
                    "type": "string",
                    "description": "Descriptive chapter title, at least 2 characters."
                },
                "summary": {
                    "type": "string",
                    "description": "Chapter outline. At least 50 characters recommended."
                },
                "summaryDetailed": {
                    "type": "string",
                    "description": "Optional extended outline."
                },
                "volumeNumber": {
                    "type": "integer",
                    "description": "Volume this chapter belongs to, when volumes are in use."
                }
            },
            "required": ["number", "title", "summary"]
        }),
    }
}

fn update_storyboard() -> Tool {
    Tool {
        name: "update_storyboard".into(),
        description: "Write one chapter: body, outline, and the updated story bible, in a \
                      single call. Always creates a new content version for the chapter. \
                      Optionally upserts characters and world entries touched by the chapter."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "chapterNumber": {
                    "type": "integer",
                    "description": "Chapter number to write."
                },
                "chapterTitle": {
                    "type": "string",
                    "description": "Descriptive title. A bare chapter number (\"第4章\", \"Chapter 4\") is rejected."
                },
                "chapter_content": {
                    "type": "string",
                    "description": "Full chapter body. At least 100 characters required, 500+ recommended."
                },
                "chapter_outline": {
                    "type": "string",
                    "description": "Detailed outline covering plot tasks, character relationship changes, and foreshadowing. At least 500 characters required."
                },
                "updated_story_bible": {
                    "type": "object",
                    "description": "Running story state after this chapter.",
                    "properties": {
                        "character_status": {
                            "type": "string",
                            "description": "One line per character: \"[name]: [status]\". Required."
                        },
                        "key_items_and_locations": { "type": "string" },
                        "active_plot_threads": { "type": "string" },
                        "important_rules": { "type": "string" }
                    },
                    "required": ["character_status"]
                },
                "volumeNumber": {
                    "type": "integer",
                    "description": "Volume this chapter belongs to."
                },
                "versionName": {
                    "type": "string",
                    "description": "Optional name for the new content version."
                },
                "characters": {
                    "type": "array",
                    "description": "Characters introduced or changed by this chapter.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "role": { "type": "string" },
                            "description": { "type": "string" },
                            "tags": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["name", "role", "description"]
                    }
                },
                "worldEntries": {
                    "type": "array",
                    "description": "World entries introduced or changed by this chapter.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": { "type": "string" },
                            "name": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["category", "name", "description"]
                    }
                },
                "writingGuidelines": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": { "type": "string" },
                            "content": { "type": "string" },
                            "isActive": { "type": "boolean" }
                        },
                        "required": ["category", "content"]
                    }
                },
                "title": {
                    "type": "string",
                    "description": "Optional new story title."
                },
                "synopsis": {
                    "type": "string",
                    "description": "Optional new story synopsis."
                },
                "alternativeTitles": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["chapterNumber", "chapterTitle", "chapter_content", "chapter_outline", "updated_story_bible"]
        }),
    }
}

fn add_character() -> Tool {
    Tool {
        name: "add_character".into(),
        description: "Add a character, or update one with the same name.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "role": {
                    "type": "string",
                    "description": "Narrative role, e.g. Protagonist, Antagonist, Mentor."
                },
                "description": {
                    "type": "string",
                    "description": "Appearance, personality, motivation. At least 50 characters recommended."
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "behaviorExamples": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "context": { "type": "string" },
                            "response": { "type": "string" }
                        },
                        "required": ["context", "response"]
                    }
                }
            },
            "required": ["name", "role", "description"]
        }),
    }
}

fn add_character_behavior() -> Tool {
    Tool {
        name: "add_character_behavior".into(),
        description: "Append one behavior example to an existing character. Fails if the \
                      character does not exist yet."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "characterName": {
                    "type": "string",
                    "description": "Exact name of an existing character."
                },
                "context": {
                    "type": "string",
                    "description": "The situation."
                },
                "response": {
                    "type": "string",
                    "description": "How the character reacts."
                }
            },
            "required": ["characterName", "context", "response"]
        }),
    }
}

fn add_world_entry() -> Tool {
    Tool {
        name: "add_world_entry".into(),
        description: "Add a world-building entry, or update the one with the same category \
                      and name."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Grouping such as Locations, Factions, Magic, History."
                },
                "name": { "type": "string" },
                "description": { "type": "string" }
            },
            "required": ["category", "name", "description"]
        }),
    }
}

fn add_writing_guideline() -> Tool {
    Tool {
        name: "add_writing_guideline".into(),
        description: "Record a writing rule or style preference to follow in future chapters."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Grouping such as Pacing, Dialogue, Tone."
                },
                "content": { "type": "string" },
                "isActive": {
                    "type": "boolean",
                    "description": "Defaults to true."
                }
            },
            "required": ["category", "content"]
        }),
    }
}
