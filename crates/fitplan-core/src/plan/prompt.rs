//! Prompt construction for plan generation. Pure logic, no I/O.

use std::fmt::Write as _;

use super::request::PlanRequest;

/// Persona sent as the system message on every generation call.
pub const SYSTEM_PROMPT: &str = "You are a professional AI workout and diet planner.";

/// Days the model must cover, in order.
pub const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Per-day activity durations, in minutes.
pub const ACTIVITY_FIELDS: [&str; 6] = [
    "treadmill",
    "power_lifting",
    "squats",
    "dead_lift",
    "cycling",
    "skipping",
];

/// Per-day nutrition targets, in grams.
pub const NUTRITION_FIELDS: [&str; 4] = ["calories", "carbohydrates", "protein", "fat"];

/// Render the user prompt for a validated request.
///
/// The same request always yields the same string.
pub fn build_user_prompt(request: &PlanRequest) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str("You are a fitness and nutrition assistant.\n");
    prompt.push_str("Create a personalized weekly AI-based workout and diet plan.\n\n");

    prompt.push_str("Inputs:\n");
    let _ = writeln!(prompt, "- Present weight: {} kg", request.present_weight);
    let _ = writeln!(prompt, "- Expected weight: {} kg", request.expected_weight);
    let _ = writeln!(prompt, "- Target months: {}", request.target_months);

    prompt.push_str("\nOutput format:\n");
    prompt.push_str("Return a strictly valid JSON object ONLY with the following fields:\n");
    let _ = writeln!(
        prompt,
        "For each day ({}), use the day name as a top-level key and include:",
        DAYS.join(", ")
    );
    for field in ACTIVITY_FIELDS {
        let _ = writeln!(prompt, "- {field} (mins)");
    }
    for field in NUTRITION_FIELDS {
        let _ = writeln!(prompt, "- {field} (grams)");
    }
    prompt.push_str("All values must be numbers.\n");
    prompt.push_str(
        "Do NOT include any markdown formatting, code fences, explanation, or extra text.\n",
    );

    prompt
}
