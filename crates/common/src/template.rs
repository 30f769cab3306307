//! Placeholder substitution for response templates.

/// Substitute `{name}` placeholders in `template` with the given values.
///
/// Replacement is literal and replaces **all** occurrences of each
/// placeholder, since a template may repeat a variable. Unknown placeholders
/// are left untouched so a misconfigured override degrades visibly instead
/// of silently.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        let needle = format!("{{{name}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_single_placeholder() {
        assert_eq!(render_template("Bottle #{id}", &[("id", "7")]), "Bottle #7");
    }

    #[test]
    fn substitutes_all_occurrences() {
        let t = "{content} … and again: {content}";
        assert_eq!(
            render_template(t, &[("content", "hi")]),
            "hi … and again: hi"
        );
    }

    #[test]
    fn leaves_unknown_placeholders() {
        assert_eq!(render_template("{nope}", &[("id", "1")]), "{nope}");
    }

    #[test]
    fn multiple_vars() {
        let t = "#{id} from {platform}";
        let out = render_template(t, &[("id", "3"), ("platform", "nostr")]);
        assert_eq!(out, "#3 from nostr");
    }

    #[test]
    fn empty_template() {
        assert_eq!(render_template("", &[("id", "1")]), "");
    }
}
