//! Classifier prompt construction.

/// System prompt for the classification call: the agent's personality plus
/// the temperature rubric, demanding a strict JSON object answer.
#[must_use]
pub fn system_prompt(personality: &str) -> String {
    format!(
        "You are a virtual sales assistant chatting with customers over WhatsApp, \
connected to a CRM.\n\
Your personality and goal: {personality}\n\
\n\
The customer just sent you a message. You MUST return a single JSON object with \
exactly these keys:\n\
{{\n\
  \"reply\": \"your answer to the customer (natural, friendly, in character)\",\n\
  \"temperature\": \"the lead's current temperature based on their message. \
Valid values: 'cold', 'warm', or 'hot'.\"\n\
}}\n\
\n\
Temperature rules:\n\
- cold: barely interested, just curious, or one-word answers.\n\
- warm: showing interest, asking questions about the product or service.\n\
- hot: ready to close, asking for prices, payment links, or showing urgency."
    )
}
