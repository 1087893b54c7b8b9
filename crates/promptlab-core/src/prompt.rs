//! Prompt builder.
//!
//! Turns raw user text plus the options picked for a task into the single
//! instruction string sent to a generation service. The layout is always
//! instruction, then text, then the rule list, so identical inputs produce
//! byte-identical prompts.

use std::collections::BTreeMap;
use std::str::FromStr;

use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{PromptLabError, Result};

const PROMPT_TEMPLATE: &str = "{% if instruction %}{{ instruction }}\n{% endif %}{{ text }}\
{% for rule in rules %}{% if loop.first %}\nRules:{% endif %}\n- {{ rule }}{% endfor %}";

/// The tab or command a prompt is built for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaskKind {
    Summarize,
    Transform,
    Expand,
    Infer,
    Chat,
}

impl TaskKind {
    /// Option keys this task understands.
    pub fn recognized_keys(&self) -> &'static [&'static str] {
        match self {
            TaskKind::Summarize => &["style"],
            TaskKind::Transform => &["tone", "formatting", "grammar_fix", "translate_to"],
            TaskKind::Expand => &["audience", "objective", "extras"],
            TaskKind::Infer | TaskKind::Chat => &[],
        }
    }
}

/// Summary output shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum SummaryStyle {
    #[default]
    #[strum(to_string = "3 bullet points", serialize = "bullets", serialize = "bullet points")]
    Bullets,
    #[strum(to_string = "short paragraph", serialize = "paragraph")]
    Paragraph,
    #[strum(to_string = "key insights + action items", serialize = "insights")]
    Insights,
    #[strum(to_string = "one line", serialize = "one-line")]
    OneLine,
    #[strum(to_string = "detailed")]
    Detailed,
}

impl SummaryStyle {
    pub fn rule(&self) -> &'static str {
        match self {
            SummaryStyle::Bullets => "Return exactly 3 concise bullet points.",
            SummaryStyle::Paragraph => "Return a concise paragraph (3–5 sentences).",
            SummaryStyle::Insights => {
                "Return two sections: 'Key Insights' and 'Action Items' in short bullets."
            }
            SummaryStyle::OneLine => "Return a single-sentence summary.",
            SummaryStyle::Detailed => "Return a detailed summary covering every main point.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tone {
    #[default]
    Neutral,
    Formal,
    Friendly,
    Polite,
    Confident,
    Enthusiastic,
    Casual,
    Funny,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Formatting {
    #[default]
    #[strum(to_string = "plain text", serialize = "plain")]
    PlainText,
    #[strum(to_string = "bulleted list", serialize = "bullets")]
    BulletedList,
    #[strum(to_string = "numbered steps", serialize = "numbered")]
    NumberedSteps,
    #[strum(to_string = "email-ready", serialize = "email")]
    EmailReady,
}

impl Formatting {
    pub fn rule(&self) -> &'static str {
        match self {
            Formatting::PlainText => "Return as plain text.",
            Formatting::BulletedList => "Return as concise bullets.",
            Formatting::NumberedSteps => "Return as numbered steps.",
            Formatting::EmailReady => "Return as a complete email with greeting and sign-off.",
        }
    }
}

/// Raw option values as a UI hands them over, keyed by option name.
///
/// Values are validated against the task's domain by [`build_prompt`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOptions(BTreeMap<String, String>);

impl PromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a `key=value` assignment, as typed on a command line.
    pub fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing option name in '{raw}'"));
        }
        Ok((key.to_string(), value.trim().to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PromptOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Builds the prompt for `task` from already-validated, non-empty `raw_text`.
///
/// Fails with [`PromptLabError::InvalidOption`] when an option value falls
/// outside its domain, or when the key is not one the task recognizes.
pub fn build_prompt(task: TaskKind, raw_text: &str, options: &PromptOptions) -> Result<String> {
    reject_unknown_keys(task, options)?;

    let (instruction, rules) = match task {
        TaskKind::Summarize => summarize_rules(options)?,
        TaskKind::Transform => transform_rules(options)?,
        TaskKind::Expand => expand_rules(options),
        TaskKind::Infer => (
            "Analyze the following text.",
            vec![
                "Identify the overall sentiment.".to_string(),
                "List the topics mentioned.".to_string(),
                "Describe the possible intent.".to_string(),
            ],
        ),
        TaskKind::Chat => ("", Vec::new()),
    };

    render(instruction, raw_text, &rules)
}

fn render(instruction: &str, text: &str, rules: &[String]) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("prompt", PROMPT_TEMPLATE)?;
    let rendered = env
        .get_template("prompt")?
        .render(context! { instruction => instruction, text => text, rules => rules })?;
    Ok(rendered)
}

fn reject_unknown_keys(task: TaskKind, options: &PromptOptions) -> Result<()> {
    let allowed = task.recognized_keys();
    match options.iter().find(|(key, _)| !allowed.contains(key)) {
        Some((key, value)) => Err(PromptLabError::invalid_option(task, key, value)),
        None => Ok(()),
    }
}

fn parse_option<T: FromStr + Default>(task: TaskKind, options: &PromptOptions, key: &str) -> Result<T> {
    match options.get(key) {
        None => Ok(T::default()),
        Some(raw) => T::from_str(raw.trim())
            .map_err(|_| PromptLabError::invalid_option(task, key, raw)),
    }
}

fn parse_flag(task: TaskKind, options: &PromptOptions, key: &str, default: bool) -> Result<bool> {
    let Some(raw) = options.get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(PromptLabError::invalid_option(task, key, raw)),
    }
}

fn summarize_rules(options: &PromptOptions) -> Result<(&'static str, Vec<String>)> {
    let style: SummaryStyle = parse_option(TaskKind::Summarize, options, "style")?;
    Ok((
        "Summarize the following text:",
        vec![style.rule().to_string()],
    ))
}

fn transform_rules(options: &PromptOptions) -> Result<(&'static str, Vec<String>)> {
    let task = TaskKind::Transform;
    let tone: Tone = parse_option(task, options, "tone")?;
    let formatting: Formatting = parse_option(task, options, "formatting")?;
    let grammar_fix = parse_flag(task, options, "grammar_fix", true)?;

    let mut rules = Vec::new();
    if grammar_fix {
        rules.push("Fix grammar, punctuation, and clarity.".to_string());
    }
    rules.push(format!("Use a {tone} tone."));
    rules.push(formatting.rule().to_string());
    if let Some(language) = options.get("translate_to").map(str::trim).filter(|l| !l.is_empty()) {
        rules.push(format!("Translate the result into {language}."));
    }

    Ok(("Transform the following text:", rules))
}

fn expand_rules(options: &PromptOptions) -> (&'static str, Vec<String>) {
    let field = |key: &str| {
        options
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };

    let rules = vec![
        format!("Recipient: {}", field("audience")),
        format!("Goal: {}", field("objective")),
        format!("Extras: {}", field("extras")),
        "Add a subject line.".to_string(),
        "Use a polite tone.".to_string(),
        "Include a clear call-to-action.".to_string(),
    ];

    ("Expand the following notes into a professional email:", rules)
}
