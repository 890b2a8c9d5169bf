//! Asset resolution - mapping character/background/effect keys to asset paths.

/// Maps logical asset names to locations the presentation layer can load.
///
/// Every method has a default template rooted at [`AssetResolver::base`],
/// so most resolvers only choose the base.
pub trait AssetResolver: Send {
    /// Prefix joined in front of every path; empty means relative paths
    fn base(&self) -> &str {
        ""
    }

    fn character_image(&self, name: &str, outfit: Option<&str>, state: Option<&str>) -> String {
        let outfit = outfit.filter(|o| !o.is_empty()).unwrap_or("default");
        let state = state.filter(|s| !s.is_empty()).unwrap_or("neutral");
        join(
            self.base(),
            &format!("assets/characters/{name}/{outfit}/{state}.png"),
        )
    }

    fn background(&self, key: &str) -> String {
        join(self.base(), &format!("assets/backgrounds/{key}"))
    }

    fn sfx(&self, key: &str) -> String {
        join(self.base(), &format!("sfx/{key}"))
    }

    /// Avatar shown next to texting messages
    fn texting_avatar(&self, name: &str) -> String {
        join(self.base(), &format!("assets/characters/{name}/texting.png"))
    }
}

fn join(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

/// Resolver using the default templates under a base directory or URL
#[derive(Debug, Clone, Default)]
pub struct BasicResolver {
    pub base: String,
}

impl BasicResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl AssetResolver for BasicResolver {
    fn base(&self) -> &str {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_image_falls_back_to_default_outfit_and_neutral_state() {
        let resolver = BasicResolver::default();
        assert_eq!(
            resolver.character_image("Alice", None, None),
            "assets/characters/Alice/default/neutral.png"
        );
        assert_eq!(
            resolver.character_image("Alice", Some("school"), Some("happy")),
            "assets/characters/Alice/school/happy.png"
        );
        assert_eq!(
            resolver.character_image("Alice", Some(""), Some("sad")),
            "assets/characters/Alice/default/sad.png"
        );
    }

    #[test]
    fn base_is_joined_once() {
        let resolver = BasicResolver::new("game/");
        assert_eq!(resolver.background("park.jpg"), "game/assets/backgrounds/park.jpg");
        assert_eq!(resolver.sfx("door.mp3"), "game/sfx/door.mp3");
        assert_eq!(
            resolver.texting_avatar("Bea"),
            "game/assets/characters/Bea/texting.png"
        );
    }
}
