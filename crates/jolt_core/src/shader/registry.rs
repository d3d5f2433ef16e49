use std::collections::HashMap;

/// Prefix of the pseudo-3D card shaders that take skew uniforms.
pub const SKEW_PREFIX: &str = "3d_skew";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub name: String,
    /// The shader reads a `shadow` flag and can draw the drop shadow itself.
    pub pass_aware: bool,
}

impl ShaderInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pass_aware: false,
        }
    }

    pub fn pass_aware(mut self) -> Self {
        self.pass_aware = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    shaders: HashMap<String, ShaderInfo>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: ShaderInfo) {
        log::info!("Registered shader '{}'", info.name);
        self.shaders.insert(info.name.clone(), info);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.shaders.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ShaderInfo> {
        self.shaders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn clear(&mut self) {
        self.shaders.clear();
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_3d_skew(name: &str) -> bool {
        name.starts_with(SKEW_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut reg = ShaderRegistry::new();
        reg.register(ShaderInfo::new("holo"));
        reg.register(ShaderInfo::new("3d_skew_card").pass_aware());
        assert!(reg.contains("holo"));
        assert!(reg.get("3d_skew_card").map(|s| s.pass_aware).unwrap_or(false));
        assert_eq!(reg.names(), vec!["3d_skew_card", "holo"]);
        assert!(reg.unregister("holo"));
        assert!(!reg.unregister("holo"));
    }

    #[test]
    fn skew_family_by_prefix() {
        assert!(ShaderRegistry::is_3d_skew("3d_skew_holo"));
        assert!(ShaderRegistry::is_3d_skew("3d_skew"));
        assert!(!ShaderRegistry::is_3d_skew("holo_3d_skew"));
    }
}
