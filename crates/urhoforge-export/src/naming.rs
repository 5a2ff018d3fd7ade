//! Resource name derivation
//!
//! Pure string transforms that turn authoring-side asset paths
//! (`Assets/Textures/rock.png`) into engine-relative resource names
//! (`Textures/rock.png`). Separators are always normalized to `/`.

/// Folder prefix that authoring-side asset paths are rooted at
const ASSET_ROOT: &str = "Assets/";

/// Characters that cannot appear in a file name on any supported platform
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Normalize separators to forward slashes
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Replace the extension of the last path segment with `new_ext`.
///
/// `new_ext` is appended verbatim (it carries its own leading dot, or a
/// whole suffix such as `/Body.xml`). Paths without an extension get
/// `new_ext` appended.
///
/// Example: `("Textures/rock.png", ".AO.png")` -> `"Textures/rock.AO.png"`
pub fn replace_extension(path: &str, new_ext: &str) -> String {
    let separator = path.rfind(['/', '\\']);
    match path.rfind('.') {
        Some(dot) if separator.map_or(true, |sep| dot > sep) => {
            format!("{}{}", &path[..dot], new_ext)
        }
        _ => format!("{}{}", path, new_ext),
    }
}

/// Extension of the last path segment, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    name.rfind('.').map(|dot| &name[dot + 1..]).filter(|ext| !ext.is_empty())
}

/// Case-insensitive extension check (`ext` given without the dot)
pub fn has_extension(path: &str, ext: &str) -> bool {
    extension(path).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Get filename from path
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Convert an authoring asset path into an output-relative resource path.
///
/// The `Assets/` root is stripped (case-insensitive) and the result is placed
/// under `subfolder` when one is configured.
///
/// Example: `("Game", "Assets/Sky/sky.cubemap")` -> `"Game/Sky/sky.cubemap"`
pub fn rel_path_from_asset_path(subfolder: &str, asset_path: &str) -> String {
    let path = normalize_separators(asset_path.trim());
    let relative = match path.get(..ASSET_ROOT.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(ASSET_ROOT) => &path[ASSET_ROOT.len()..],
        _ => path.as_str(),
    };

    let subfolder = normalize_separators(subfolder);
    let subfolder = subfolder.trim_matches('/');
    if subfolder.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", subfolder, relative)
    }
}

/// Make a display name safe to use as a single file name component
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_extension() {
        assert_eq!(replace_extension("Textures/rock.png", ".AO.png"), "Textures/rock.AO.png");
        assert_eq!(replace_extension("Sky/sky.cubemap", ".xml"), "Sky/sky.xml");
        assert_eq!(replace_extension("Models/car.fbx", "/Body.xml"), "Models/car/Body.xml");
    }

    #[test]
    fn test_replace_extension_without_extension() {
        assert_eq!(replace_extension("Textures/rock", ".png"), "Textures/rock.png");
        // A dot in a directory name is not an extension
        assert_eq!(replace_extension("v1.2/rock", ".png"), "v1.2/rock.png");
    }

    #[test]
    fn test_rel_path_from_asset_path() {
        assert_eq!(rel_path_from_asset_path("", "Assets/Textures/rock.png"), "Textures/rock.png");
        assert_eq!(rel_path_from_asset_path("Game", "assets\\Sky\\sky.cubemap"), "Game/Sky/sky.cubemap");
        assert_eq!(rel_path_from_asset_path("/Game/", "Packages/pkg/a.png"), "Game/Packages/pkg/a.png");
    }

    #[test]
    fn test_file_name_and_extension() {
        assert_eq!(file_name("Sky/sky.dds"), "sky.dds");
        assert_eq!(file_name("sky.dds"), "sky.dds");
        assert_eq!(extension("Sky/sky.DDS"), Some("DDS"));
        assert_eq!(extension("Sky/sky"), None);
        assert!(has_extension("Materials/Rock.MAT", "mat"));
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("Body: Paint/Red"), "Body_ Paint_Red");
        assert_eq!(safe_file_name("  "), "_");
    }
}
