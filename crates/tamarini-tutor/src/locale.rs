//! Localized user-facing text.

use crate::config::Language;

/// Fixed user-facing strings for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strings {
    /// First tutor message of every conversation.
    pub greeting: &'static str,
    /// Shown instead of a reply when the completion fails.
    pub apology: &'static str,
    /// Student text sent with a `similar-exercise` request.
    pub similar_request: &'static str,
    /// Student text sent when only an image was attached.
    pub image_only_request: &'static str,
    /// Indicator shown while a reply is being generated.
    pub thinking: &'static str,
    /// Prefix for a pending image attachment.
    pub attached: &'static str,
    /// Hint shown in the input area.
    pub input_placeholder: &'static str,
    /// Label for the new-exercise command.
    pub new_exercise: &'static str,
}

const FRENCH: Strings = Strings {
    greeting: "Salut, je suis TAMARINI.\n\
        Envoie une photo claire de ton exercice de maths, ou écris-le ici, puis explique-moi ce que tu as compris. \
        Je vais te guider étape par étape, et à la fin on vérifiera ta réponse ensemble.",
    apology: "Désolé, j’ai eu un problème pour réfléchir à ça. Réessaie dans un instant.",
    similar_request: "Je voudrais un exercice similaire au précédent.",
    image_only_request: "Voici l’image de mon exercice.",
    thinking: "TAMARINI réfléchit…",
    attached: "Image jointe :",
    input_placeholder: "Écris ce que tu comprends, ta démarche, ou ta réponse finale…",
    new_exercise: "Nouvel exercice",
};

const ARABIC: Strings = Strings {
    greeting: "مرحباً، أنا تَمَارِينِي.\n\
        التقط صورة واضحة لتمرين الرياضيات، أو اكتب السؤال هنا، ثم أخبرني ماذا فهمت حتى الآن. \
        سأرشدك خطوة بخطوة، وفي النهاية نتحقق من إجابتك معاً.",
    apology: "عذراً، حدث خطأ أثناء المعالجة. حاول مرة أخرى بعد قليل.",
    similar_request: "أريد تمريناً مشابهاً للتمرين السابق.",
    image_only_request: "هذه صورة التمرين.",
    thinking: "تَمَارِينِي يفكّر…",
    attached: "صورة مرفقة:",
    input_placeholder: "اكتب ما تفهمه من التمرين، أو خطواتك، أو الجواب النهائي…",
    new_exercise: "تمرين جديد",
};

/// Returns the string table for a language.
#[must_use]
pub const fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Fr => &FRENCH,
        Language::Ar => &ARABIC,
    }
}
