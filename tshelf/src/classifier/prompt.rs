use common::{level_key, CurriculumConfig};

/// Build the classification prompt for one article.
pub fn classification_prompt(taxonomy: &CurriculumConfig, title: &str, content: &str) -> String {
    let topics = taxonomy
        .topics
        .iter()
        .map(|t| format!("- {}", t))
        .collect::<Vec<_>>()
        .join("\n");

    let levels = taxonomy
        .levels
        .iter()
        .map(|l| match level_description(&level_key(l)) {
            Some(desc) => format!("   - {}: {}", l, desc),
            None => format!("   - {}", l),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let example_topic = taxonomy.topics.first().map(String::as_str).unwrap_or("Topic");
    let example_level = taxonomy
        .levels
        .get(1)
        .or_else(|| taxonomy.levels.first())
        .map(String::as_str)
        .unwrap_or("beginner");

    format!(
        r#"You are an AI curriculum designer analyzing technical articles.

CRITICAL: Respond with valid JSON only. No markdown, no code fences, no commentary.

TOPICS (choose exactly ONE):
{topics}

If none fits, use a short descriptive topic label of your own.

Analyze the article and determine:

1. SKIP only when the article is:
   - a job posting or recruiting message
   - an event announcement (conference, meetup, webinar)
   - pure marketing or sales copy with no learning value

   Do NOT skip an article that teaches any technical concept, including
   product announcements or company updates that explain how something works.

2. TOPIC: the one topic it teaches.

3. CONCEPTS TAUGHT (2-5): specific core concepts, each with a confidence between 0 and 1.

4. PREREQUISITES (0-3): concepts a reader must already understand, each with a
   confidence between 0 and 1. Only list what is truly required.

5. DIFFICULTY:
   level, one of:
{levels}
   technical_depth: integer 1-10, how technical the writing is
   reading_time_minutes: realistic estimate in minutes

6. LEARNING OUTCOMES (2-4): concrete things the reader will understand afterwards.

7. STRATEGIC QUESTIONS (2-3): thought-provoking questions about the implications.

If skipping, return:
{{"skip": true}}

Otherwise return:
{{
  "skip": false,
  "topic": "{example_topic}",
  "concepts_taught": [
    {{"name": "concept name", "confidence": 0.9}}
  ],
  "prerequisites": [
    {{"name": "prerequisite concept", "confidence": 0.85}}
  ],
  "difficulty": {{
    "level": "{example_level}",
    "technical_depth": 4,
    "reading_time_minutes": 8
  }},
  "learning_outcomes": [
    "specific outcome 1",
    "specific outcome 2"
  ],
  "strategic_questions": [
    "question 1",
    "question 2"
  ]
}}

Article:
Title: {title}
Content: {content}
"#
    )
}

fn level_description(level: &str) -> Option<&'static str> {
    let desc = match level {
        "foundational" => "first principles, no prerequisites",
        "beginner" => "basic AI familiarity helpful, introductory",
        "intermediate" => "solid understanding of AI concepts required",
        "advanced" => "deep technical knowledge required, expert-level",
        "application" => "real-world implications and industry impact",
        "1" => "no background assumed",
        "2" => "basic familiarity helpful",
        "3" => "working knowledge required",
        "4" => "strong technical background required",
        "5" => "expert-level",
        _ => return None,
    };
    Some(desc)
}
