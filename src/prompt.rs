// src/prompt.rs
// Prompt compiler: validated request -> (system instruction, user instruction)
//
// Both functions are pure. Unset optional fields are substituted with their
// {{TOKEN}} markers before the prompt is assembled, so the model is never
// handed a blank it could fill with invented facts. Labels appear in a fixed
// order to keep prompts deterministic and diffable across requests.

use crate::models::{GenerateRequest, Placeholder};

/// Fixed system instruction sent with every request. Embeds the output
/// format contract and the tone definitions.
pub const SYSTEM_PROMPT: &str = r#"You are a professional complaint and escalation writing assistant.
You help users create clear, professional, and actionable complaints.

Guidelines:
1. Always maintain professionalism - never generate abusive, threatening, or inappropriate content
2. Structure content clearly with proper paragraphs and formatting
3. Use placeholders like {{DATE}}, {{ORDER_ID}}, {{RECIPIENT_NAME}}, {{COMPANY_NAME}} when specific information is missing
4. Adapt tone appropriately:
   - Polite: Courteous, respectful, seeking cooperation
   - Firm: Direct, clear expectations, setting boundaries
   - Strict: Formal, demanding, indicating potential consequences (still professional, no threats)
5. Make complaints actionable with specific requests and deadlines
6. Include relevant details but keep messages concise and readable
7. For escalations, emphasize urgency and reference previous communications
8. For follow-ups, be professional and reference the timeline

Output Rules:
- Return ONLY valid JSON (no markdown fences)
- JSON keys must be exactly:
  whatsapp_message, email_subject, email_body, escalation_subject, escalation_body, followup_message, tips
"#;

fn field_or_token(value: &Option<String>, placeholder: Placeholder) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => placeholder.token(),
    }
}

/// Compile the per-request user instruction.
pub fn build_user_prompt(request: &GenerateRequest) -> String {
    format!(
        "\
Generate professional complaint drafts for the following scenario:

Category: {category}
Tone: {tone}

Title: {title}
Description: {description}

Incident Date: {incident_date}
Location: {location}
Company/Institution: {company}
Recipient Name: {recipient}
Order/Ticket ID: {order_id}
Desired Resolution: {resolution}
Proof Available: {proof}

Return valid JSON with these keys:
1) whatsapp_message (short and clear)
2) email_subject
3) email_body
4) escalation_subject
5) escalation_body
6) followup_message
7) tips (2 to 4 short actionable tips)
",
        category = request.category.as_str(),
        tone = request.tone.as_str(),
        title = request.title,
        description = request.description,
        incident_date = field_or_token(&request.incident_date, Placeholder::Date),
        location = field_or_token(&request.location, Placeholder::Location),
        company = field_or_token(&request.company_or_institution, Placeholder::CompanyName),
        recipient = field_or_token(&request.recipient_name, Placeholder::RecipientName),
        order_id = field_or_token(&request.order_or_ticket_id, Placeholder::OrderId),
        resolution = request.desired_resolution,
        proof = request.proof_available,
    )
}
