//! Prompt composition for the reply generator and the prompt rewriter
//!
//! The caller owns prompt construction; the generation client only sends
//! the finished text and pulls a single JSON field back out.

use crate::types::Turn;

/// Base chatbot prompt used when no stored version is reachable
pub const DEFAULT_PROMPT: &str = r#"You are a professional, friendly, and human-like immigration consultant for Thailand named Alex.
Your goal is to assist clients with the Destination Thailand Visa (DTV).
You must sound natural, confident, and concise.
Avoid robotic greetings or overly formal legal language.
Never mention that you are an AI or a language model.
If you need more information to give a good answer, ask clarifying questions naturally.
Keep your responses relatively short and conversational, like a real person chatting.

Input:
- Client's recent messages
- Chat history

Output:
- A JSON object with a single key "reply" containing your text response.
"#;

/// JSON field carrying a generated reply
pub const REPLY_FIELD: &str = "reply";

/// JSON field carrying a rewritten prompt
pub const PROMPT_FIELD: &str = "prompt";

const IMPROVEMENT_INSTRUCTION: &str = r#"You are an expert AI Prompt Engineer.
Your objective is to IMPROVE a chatbot's system prompt to better mimic a human consultant.

You will be given:
1. The CURRENT SYSTEM PROMPT
2. A TRAINING SAMPLE (Conversation Context + Real Consultant Reply)
3. The AI'S PREDICTED REPLY (generated using the current prompt)

Your Task:
1. Compare the AI's Prediction vs. the Real Reply.
2. Identify differences in tone, formatting, conciseness, specific knowledge, or greeting style.
3. Rewrite the System Prompt to guide the AI to sound more like the Real Consultant.
4. Keep the prompt concise.

Output Must Be JSON:
{
  "prompt": "The fully updated system prompt text..."
}"#;

const MANUAL_INSTRUCTION: &str = r#"You are an AI System Admin.
Your task is to update a System Prompt based on user instructions.
Keep the core structure if possible, but apply the requested changes.
Return JSON: { "prompt": "..." }"#;

/// Render a chat history as `ROLE: message` lines
pub fn format_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}\n", turn.role.as_str().to_uppercase(), turn.message))
        .collect()
}

/// Prompt asking the backend for the consultant's next reply
pub fn compose_reply_prompt(system_prompt: &str, client_sequence: &str, history: &[Turn]) -> String {
    format!(
        r#"
SYSTEM INSTRUCTION:
{system_prompt}

CHAT HISTORY:
{history}

CLIENT MESSAGE:
{client_sequence}

Respond in plain JSON only: {{ "reply": "..." }}
"#,
        history = format_history(history),
    )
}

/// Prompt asking the backend to rewrite the system prompt so its
/// prediction moves toward the real consultant reply
pub fn compose_improvement_prompt(
    current_prompt: &str,
    client_sequence: &str,
    history: &[Turn],
    consultant_reply: &str,
    predicted_reply: &str,
) -> String {
    format!(
        r#"
SYSTEM ROLE:
{IMPROVEMENT_INSTRUCTION}

=== INPUT DATA ===
=== CURRENT PROMPT ===
{current_prompt}

=== CONTEXT ===
{history}
CLIENT: {client_sequence}

=== AI PREDICTION (TO IMPROVE) ===
{predicted_reply}

=== REAL HUMAN REPLY (TARGET) ===
{consultant_reply}

Please generate the improved system prompt in JSON format.
"#,
        history = format_history(history),
    )
}

/// Prompt asking the backend to apply operator instructions to the prompt
pub fn compose_manual_prompt(current_prompt: &str, instructions: &str) -> String {
    format!(
        r#"
SYSTEM ROLE:
{MANUAL_INSTRUCTION}

CURRENT PROMPT:
{current_prompt}

USER INSTRUCTIONS:
{instructions}

Update the prompt and return JSON.
"#
    )
}
