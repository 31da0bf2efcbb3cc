//! Prompt templates for every generation task.
//!
//! Each builder is a pure function of its structured input — no I/O, no
//! generation. Every template ends with a strict output-format contract the
//! extractor relies on.

/// Persona summary prompt for the in-process text model.
///
/// The trailing `Persona:` marker doubles as the prompt-echo marker the
/// line extractor skips.
pub fn persona_prompt(
    name: &str,
    position: &str,
    department: &str,
    language: &str,
    samples: &[String],
) -> String {
    let samples_text = samples.join(" ");
    format!(
        "Generate a one-sentence professional persona summary.\n\n\
         Input:\n\
         Name: {name}\n\
         Position: {position}\n\
         Department: {department}\n\
         Language: {language}\n\
         Writing samples: {samples_text}\n\n\
         Output format: the summary must include these fields exactly\n\
         {name} ({position}, {department}). Preferred language: {language}. [tone] tone. [style] communication style.\n\n\
         Persona:"
    )
}

/// CV field-extraction prompt for the vision model. Fixed 5-field JSON schema.
pub fn cv_extraction_prompt() -> String {
    "You are an AI assistant that extracts information from CV/resume images.\n\n\
     Please analyze the CV image and extract the following information:\n\
     1. Name (full name of the candidate)\n\
     2. Position (job title or desired position)\n\
     3. Skills (list up to 10 key technical skills)\n\
     4. Experience (total years of professional experience)\n\
     5. Education (highest degree)\n\n\
     Return ONLY valid JSON in this exact format with no additional text:\n\
     {\n\
     \x20 \"name\": \"Full Name\",\n\
     \x20 \"position\": \"Job Title\",\n\
     \x20 \"skills\": [\"skill1\", \"skill2\", \"skill3\"],\n\
     \x20 \"experience\": \"X years\",\n\
     \x20 \"education\": \"Degree Name\"\n\
     }\n\n\
     Output:"
        .to_string()
}

/// Draft-reply prompt. The instruction section is omitted entirely when no
/// instruction was supplied, and objective #2 changes wording to match.
pub fn draft_reply_prompt(
    persona_string: &str,
    subject: &str,
    body: &str,
    instruction: Option<&str>,
    has_attachments: bool,
) -> String {
    let instruction = instruction.map(str::trim).filter(|s| !s.is_empty());

    let mut prompt = format!(
        "You are an AI assistant that drafts email replies based on user persona and instructions.\n\n\
         Persona: {persona_string}\n\n\
         Original Email Subject: {subject}\n\
         Original Email Body: {body}\n\n"
    );

    if has_attachments {
        prompt.push_str(
            "Note: The email contains attachments (images shown above represent PDF content).\n\n",
        );
    }

    if let Some(instruction) = instruction {
        prompt.push_str(&format!("Instruction: {instruction}\n\n"));
    }

    prompt.push_str("Draft a reply email that:\n1. Matches the persona's tone and language preference\n2. ");
    if instruction.is_some() {
        prompt.push_str("Follows the given instruction\n");
    } else {
        prompt.push_str("Provides an appropriate response to the original email\n");
    }

    prompt.push_str(
        "3. References attachment content if relevant\n\
         4. Is professional and appropriate\n\n\
         Return ONLY valid JSON in this exact format with no additional text:\n\
         {\n\
         \x20 \"subject\": \"Re: [original subject]\",\n\
         \x20 \"draft_reply\": \"Your drafted email reply here\"\n\
         }\n\n\
         Output:",
    );

    prompt
}

/// Email classification prompt: exactly one of four fixed categories plus a
/// confidence value.
pub fn classification_prompt(subject: &str, body: &str, has_attachments: bool) -> String {
    let mut prompt = format!(
        "You are an AI assistant that classifies emails based on urgency and priority.\n\n\
         Email Subject: {subject}\n\
         Email Body: {body}\n\n"
    );

    if has_attachments {
        prompt.push_str(
            "Note: The email contains attachments (images shown above represent PDF content).\n\n",
        );
    }

    prompt.push_str(
        "Classify this email into ONE of the following categories:\n\
         1. \"Urgent & Action Required\" - Requires immediate attention and action\n\
         2. \"Normal Follow-up\" - Regular business communication requiring response\n\
         3. \"FYI / Low Priority\" - Informational only, no immediate action needed\n\
         4. \"Spam\" - Unsolicited, irrelevant, or suspicious content\n\n\
         Consider:\n\
         - Time-sensitive keywords (deadline, urgent, ASAP, today, tomorrow)\n\
         - Action verbs (submit, complete, respond, approve)\n\
         - Sender context and attachment relevance\n\n\
         Return ONLY valid JSON in this exact format with no additional text:\n\
         {\n\
         \x20 \"category\": \"One of the four categories above\",\n\
         \x20 \"confidence\": 0.85\n\
         }\n\n\
         Output:",
    );

    prompt
}
