use std::fmt;
use std::str::FromStr;

use crate::ChatMessage;

/// Caption / summary languages as `(code, display label)`
pub const LANGUAGES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("am", "አማርኛ"),
    ("ar", "العربية"),
    ("az", "Azərbaycan"),
    ("id", "Bahasa Indonesia"),
    ("ms", "Bahasa Melayu"),
    ("bn", "বাংলা"),
    ("be", "Беларуская"),
    ("bs", "Bosanski"),
    ("bg", "Български"),
    ("ca", "Català"),
    ("zh", "中文"),
    ("cy", "Cymraeg"),
    ("cs", "Čeština"),
    ("da", "Dansk"),
    ("de", "Deutsch"),
    ("et", "Eesti"),
    ("en", "English"),
    ("es", "Español"),
    ("fi", "Suomi"),
    ("fr", "Français"),
    ("ga", "Gaeilge"),
    ("ka", "ქართული"),
    ("el", "Ελληνικά"),
    ("gu", "ગુજરાતી"),
    ("he", "עברית"),
    ("hi", "हिन्दी"),
    ("hr", "Hrvatski"),
    ("hu", "Magyar"),
    ("is", "Íslenska"),
    ("zu", "isiZulu"),
    ("it", "Italiano"),
    ("ja", "日本語"),
    ("kn", "ಕನ್ನಡ"),
    ("kk", "Қазақ"),
    ("km", "ខ្មែរ"),
    ("ko", "한국어"),
    ("ky", "Кыргызча"),
    ("lo", "ລາວ"),
    ("lv", "Latviešu"),
    ("lt", "Lietuvių"),
    ("mk", "Македонски"),
    ("ml", "മലയാളം"),
    ("mr", "मराठी"),
    ("mn", "Монгол"),
    ("my", "မြန်မာ"),
    ("ne", "नेपाली"),
    ("nl", "Nederlands"),
    ("no", "Norsk"),
    ("or", "ଓଡ଼ିଆ"),
    ("ps", "پښتو"),
    ("pa", "ਪੰਜਾਬੀ"),
    ("pl", "Polski"),
    ("pt", "Português"),
    ("fa", "فارسی"),
    ("ro", "Română"),
    ("ru", "Русский"),
    ("sq", "Shqip"),
    ("si", "සිංහල"),
    ("sk", "Slovenčina"),
    ("sl", "Slovenščina"),
    ("so", "Soomaali"),
    ("sr", "Српски"),
    ("sw", "Kiswahili"),
    ("sv", "Svenska"),
    ("ta", "தமிழ்"),
    ("te", "తెలుగు"),
    ("th", "ไทย"),
    ("tr", "Türkçe"),
    ("uk", "Українська"),
    ("ur", "اردو"),
    ("uz", "Oʻzbek"),
    ("vi", "Tiếng Việt"),
];

pub fn is_known_language(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display label for a language code, English when unknown
pub fn language_label(code: &str) -> &'static str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or("English")
}

/// User-selectable Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Model {
    Gemini25Pro,
    Gemini25Flash,
    #[default]
    Gemini25FlashLite,
    Gemini20Flash,
    Gemini20FlashLite,
}

impl Model {
    pub const ALL: [Model; 5] = [
        Model::Gemini25Pro,
        Model::Gemini25Flash,
        Model::Gemini25FlashLite,
        Model::Gemini20Flash,
        Model::Gemini20FlashLite,
    ];

    /// Value stored in preferences and cache keys
    pub fn value(&self) -> &'static str {
        match self {
            Model::Gemini25Pro => "gemini-2.5-pro",
            Model::Gemini25Flash => "gemini-2.5-flash",
            Model::Gemini25FlashLite => "gemini-2.5-flash-lite",
            Model::Gemini20Flash => "gemini-2.0-flash",
            Model::Gemini20FlashLite => "gemini-2.0-flash-lite",
        }
    }

    /// Provider-side model id sent to the Gemini API
    pub fn api_id(&self) -> &'static str {
        match self {
            Model::Gemini25Pro => "gemini-2.5-pro",
            Model::Gemini25Flash => "gemini-2.5-flash",
            Model::Gemini25FlashLite => "gemini-2.5-flash-lite",
            Model::Gemini20Flash => "gemini-2.0-flash",
            Model::Gemini20FlashLite => "gemini-2.0-flash-lite",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Model::Gemini25Pro => "Gemini 2.5 Pro",
            Model::Gemini25Flash => "Gemini 2.5 Flash",
            Model::Gemini25FlashLite => "Gemini 2.5 Flash-Lite",
            Model::Gemini20Flash => "Gemini 2.0 Flash",
            Model::Gemini20FlashLite => "Gemini 2.0 Flash-Lite",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Model::Gemini25Pro => "Complex reasoning model.",
            Model::Gemini25Flash => "Balance of price and performance.",
            Model::Gemini25FlashLite => "Cost-effective for high-throughput tasks.",
            Model::Gemini20Flash => "Well-rounded with price-performance focus.",
            Model::Gemini20FlashLite => "Cost-efficient and low latency.",
        }
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.value() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// How long a summary should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 3] = [SummaryLength::Short, SummaryLength::Medium, SummaryLength::Long];

    pub fn value(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryLength::Short => "Concise",
            SummaryLength::Medium => "Medium",
            SummaryLength::Long => "Detailed",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            SummaryLength::Short => "Provide a concise summary (2-3 sentences) highlighting the top insights.",
            SummaryLength::Medium => {
                "Provide a medium-length summary (3-5 bullet sentences) covering the main sections and key takeaways."
            }
            SummaryLength::Long => {
                "Provide a detailed summary (6+ sentences) including context, supporting points, \
                 and any action items discussed."
            }
        }
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SummaryLength::ALL
            .into_iter()
            .find(|l| l.value() == s)
            .ok_or_else(|| format!("unknown summary length: {s}"))
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

const FOCUS_DIRECTIVE: &str =
    "Focus on the main narrative arc, important data points, and any explicit recommendations.";

const TIMESTAMP_DIRECTIVE: &str = "Include timestamps at key points in the summary using the format \
mm:ss or hh:mm:ss (e.g., '5:23', '12:45', '1:23:45'). \
Place timestamps inline where they are most relevant to help readers navigate to specific moments in the video.";

pub fn build_summary_prompt(transcript_text: &str, language: &str, length: SummaryLength) -> String {
    [
        format!(
            "You are summarizing a YouTube video transcript in {}.",
            language_label(language)
        ),
        length.instruction().to_string(),
        FOCUS_DIRECTIVE.to_string(),
        TIMESTAMP_DIRECTIVE.to_string(),
        "Transcript:".to_string(),
        format!("\"\"\"{transcript_text}\"\"\""),
    ]
    .join("\n\n")
}

fn build_chat_system_prompt(transcript_text: &str, language: &str) -> String {
    [
        "You are a helpful assistant answering questions about a YouTube video.".to_string(),
        format!(
            "You have access to the video transcript in {}.",
            language_label(language)
        ),
        "Use the transcript to provide accurate, contextual answers.".to_string(),
        "If the question cannot be answered from the transcript, say so.".to_string(),
        "Keep responses concise and relevant.".to_string(),
        String::new(),
        "Video Transcript:".to_string(),
        format!("\"\"\"{transcript_text}\"\"\""),
    ]
    .join("\n")
}

/// Full chat prompt: preamble, transcript, history and a trailing `Assistant:` cue.
pub fn build_chat_prompt(transcript_text: &str, language: &str, messages: &[ChatMessage]) -> String {
    let history = messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nConversation History:\n{history}\n\nAssistant:",
        build_chat_system_prompt(transcript_text, language)
    )
}
