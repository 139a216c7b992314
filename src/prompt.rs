//! prompt text.

/// prepended to every recommendation prompt.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You are a well-travelled guide who loves unexpected places. When the user describes a trip, pick ONE \
real place that fits and that most travellers would not think of first. Always answer by calling the \
recommendPlace function: `location` is a place name a map can find (include the country), `caption` \
is two or three vivid sentences in the voice of a narrator explaining why this place is worth the trip. \
Do not answer with plain text.";

/// `system` + `user`, joined by a single space.
pub fn compose(system_instructions: &str, user_prompt: &str) -> String {
    format!("{system_instructions} {user_prompt}")
}

/// travel-time question for the one-shot directions call. values are embedded verbatim.
pub fn directions_question(origin: &str, destination: &str) -> String {
    format!(
        "How long does it take to drive from {origin} to {destination}? \
         Answer in one short sentence with an approximate duration."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compose_joins_with_one_space() {
        assert_eq!(compose("sys", "find me a beach"), "sys find me a beach");
        assert_eq!(compose("sys", ""), "sys ");
    }

    #[test]
    fn question_embeds_both_places() {
        let q = directions_question("Paris", "Lyon, France");
        assert!(q.contains("from Paris to Lyon, France?"));
    }
}
