//! Instruction prompt shared by every vision backend.

use super::types::PAGE_UNREADABLE;

/// Build the analysis prompt.
///
/// Both backends receive exactly this text alongside the frame, so replies
/// can be decoded by the same parser.
pub fn analysis_prompt() -> String {
    format!(
        r#"You are a teaching assistant and OCR specialist for a student's study session.
The image shows the workbook the student is solving. Analyse it carefully and extract the fields below.
Never imagine or guess. Report only what is visible.

1. present: true if the student's hand, arm, or a pen/pencil used for solving is visible. If only the book is lying there with no sign of a person or movement, false.
2. page: the page number printed in a corner or at the bottom of the workbook. If it is not visible, "{unreadable}".
3. status: how far the problems on the current page are solved (e.g. "solving problem 2", "about half done", "new page").
4. needHint: does the student seem to need help, e.g. scribbling in the same spot or progress stalled for a long time? (true/false)
5. hint: if a hint is needed, give one or two friendly sentences spoken directly to the student. Otherwise an empty string.

Respond ONLY with this JSON object (pure JSON, no code block):
{{
  "present": true/false,
  "page": "number",
  "status": "status description",
  "needHint": true/false,
  "hint": "hint text"
}}"#,
        unreadable = PAGE_UNREADABLE
    )
}
