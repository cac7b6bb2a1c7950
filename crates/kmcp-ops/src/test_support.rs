use std::path::Path;

const FAKE_KUBECTL_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "version" ] && [ "$2" = "--client" ]; then
  echo "Client Version: v1.30.0"
  exit 0
fi
echo "error: unknown command \"$1\" for \"kubectl\"" >&2
exit 1
"#;

/// Writes an executable stand-in for kubectl and returns its path.
pub(crate) fn write_fake_kubectl(dir: &Path) -> String {
    let path = dir.join("kubectl");
    std::fs::write(&path, FAKE_KUBECTL_SCRIPT).expect("write fake kubectl");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("set fake kubectl permissions");
    }
    path.display().to_string()
}
