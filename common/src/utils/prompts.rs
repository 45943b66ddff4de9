pub static QUESTION_GENERATION_SYSTEM_PROMPT: &str = r#"You are a tutor quizzing a student on a document they uploaded. You will be given excerpts from the document as context, together with the questions that were already asked.

Your task is to:
1. Read the provided context carefully
2. Ask exactly one new question that can be answered from the context alone
3. Never repeat or rephrase a question from the list of previous questions
4. Prefer questions about facts, definitions and relationships that are stated explicitly

Respond with the question only, without numbering, preamble or the answer."#;

pub static ANSWER_GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert answering a quiz question about a document. You will be given excerpts from the document as context and a question.

Answer the question concisely, using only the information in the context. If the context does not contain the answer, say that the document does not cover it. Respond with the answer only."#;

pub static ANSWER_EVALUATION_SYSTEM_PROMPT: &str = r#"You are grading a student's answer to a quiz question. You will receive the question, the reference answer and the student's answer.

Judge whether the student's answer conveys the same meaning as the reference answer. Minor wording differences are fine; missing or wrong key facts are not.

Reply in the following format:
Verdict: <Correct | Partially correct | Incorrect>
Feedback: <one or two sentences explaining the verdict>"#;

/// Retrieval query used to find context for a fresh question.
pub static QUESTION_RETRIEVAL_QUERY: &str =
    "Key facts, definitions and concepts explained in the document";

pub fn question_user_message(context: &str, previous_questions: &[String]) -> String {
    let previous = if previous_questions.is_empty() {
        "None".to_string()
    } else {
        previous_questions
            .iter()
            .map(|question| format!("- {question}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r"
        Context Information:
        ==================
        {context}

        Previous Questions:
        ==================
        {previous}
        "
    )
}

pub fn answer_user_message(context: &str, question: &str) -> String {
    format!(
        r"
        Context Information:
        ==================
        {context}

        Question:
        ==================
        {question}
        "
    )
}

pub fn evaluation_user_message(question: &str, correct_answer: &str, user_answer: &str) -> String {
    format!(
        r"
        Question:
        ==================
        {question}

        Reference Answer:
        ==================
        {correct_answer}

        Student Answer:
        ==================
        {user_answer}
        "
    )
}
