//! System-line templates, one per communication style.
//!
//! Placeholders: `{name}`, `{context}`, `{personality}`, `{style}`.

use responder_core::persona::Persona;

/// Style used when `persona.style` names no template.
pub const DEFAULT_STYLE: &str = "formal";

/// Fixed reply-length instruction appended after the system line.
pub const BREVITY_INSTRUCTION: &str = "Jawablah dengan sangat singkat, cukup 1-2 kalimat. \
Fokus pada menjaga percakapan tetap hidup, hindari penjelasan panjang atau akademis.";

const STYLE_TEMPLATES: &[(&str, &str)] = &[
    (
        "formal",
        "Kamu adalah {name}, seorang {context} dari JTRADE dengan gaya komunikasi {style} \
         dan kepribadian {personality}.",
    ),
    (
        "edukatif",
        "Kamu adalah {name}, seorang {context} dari JTRADE yang menjelaskan istilah investasi \
         dengan bahasa sederhana. Kepribadianmu {personality}.",
    ),
    (
        "empatik",
        "Kamu adalah {name}, seorang {context} dari JTRADE yang hangat dan peduli pada \
         kekhawatiran lawan bicara. Kepribadianmu {personality}.",
    ),
    (
        "faktual",
        "Kamu adalah {name}, seorang {context} dari JTRADE yang menjawab dengan fakta dan \
         angka secara objektif. Kepribadianmu {personality}.",
    ),
    (
        "persuasif",
        "Kamu adalah {name}, seorang {context} dari JTRADE yang meyakinkan dan mengajak \
         lawan bicara mengambil langkah. Kepribadianmu {personality}.",
    ),
];

/// Names of every known style template, in declaration order.
pub fn style_names() -> impl Iterator<Item = &'static str> {
    STYLE_TEMPLATES.iter().map(|(name, _)| *name)
}

/// The raw template for `style`, falling back to [`DEFAULT_STYLE`].
pub fn template_for(style: &str) -> &'static str {
    let key = style.trim().to_lowercase();
    STYLE_TEMPLATES
        .iter()
        .find(|(name, _)| *name == key)
        .or_else(|| STYLE_TEMPLATES.iter().find(|(name, _)| *name == DEFAULT_STYLE))
        .map(|(_, template)| *template)
        .unwrap_or_default()
}

/// Render the system line for `persona`.
pub fn render_system(persona: &Persona) -> String {
    template_for(&persona.style)
        .replace("{name}", &persona.name)
        .replace("{context}", &persona.context)
        .replace("{personality}", &persona.personality)
        .replace("{style}", &persona.style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_uses_formal_line() {
        let line = render_system(&Persona::default());
        assert_eq!(
            line,
            "Kamu adalah CS JTRADE, seorang investment_advisor dari JTRADE dengan gaya \
             komunikasi formal dan kepribadian ramah dan profesional."
        );
    }

    #[test]
    fn unknown_style_falls_back_to_default() {
        assert_eq!(template_for("santai"), template_for(DEFAULT_STYLE));
    }

    #[test]
    fn style_lookup_ignores_case() {
        assert_eq!(template_for(" Empatik "), template_for("empatik"));
        assert_ne!(template_for("empatik"), template_for(DEFAULT_STYLE));
    }

    #[test]
    fn every_template_names_persona_and_context() {
        for style in style_names() {
            let t = template_for(style);
            assert!(t.contains("{name}") && t.contains("{context}"), "{style}");
        }
        let persona = Persona {
            name: "Rina".into(),
            context: "risk_manager".into(),
            style: "faktual".into(),
            ..Persona::default()
        };
        let line = render_system(&persona);
        assert!(line.starts_with("Kamu adalah Rina, seorang risk_manager"));
        assert!(!line.contains('{'));
    }
}
