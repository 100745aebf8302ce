use std::{
    collections::HashMap,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::info;

use crate::{
    auth::Session,
    instance::Instance,
    json::version::meta::vanilla::{ConditionalValue, Element, Rule},
    minecraft::{
        config::Dirs,
        install::Prepared,
        parse::ParseRule,
        CLASSPATH_SEPARATOR,
    },
};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}").unwrap());

/// Session-independent launch options.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub session: Session,
    /// Server address to join immediately after startup.
    pub quick_play_server: Option<String>,
    /// World name to open immediately after startup.
    pub quick_play_world: Option<String>,
    pub demo: bool,
    pub disable_multiplayer: bool,
    pub disable_chat: bool,
}

/// A fully assembled launch command, before any process is spawned.
///
/// Kept inspectable so callers can log or modify the invocation, and so
/// assembly is testable without executing anything.
#[derive(Debug, Clone)]
pub struct LaunchEnvironment {
    pub java_bin: PathBuf,
    pub jvm_args: Vec<String>,
    pub main_class: String,
    pub game_args: Vec<String>,
    pub game_dir: PathBuf,
}

impl LaunchEnvironment {
    /// Builds the process command for this environment.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.java_bin);
        command
            .args(&self.jvm_args)
            .arg(&self.main_class)
            .args(&self.game_args)
            .current_dir(&self.game_dir);
        command
    }
}

/// Strategy for driving the spawned game process.
#[allow(async_fn_in_trait)]
pub trait Runner {
    async fn run(&self, command: Command) -> crate::Result<ExitStatus>;
}

/// Runs the game with its output attached to the launcher's console.
pub struct ConsoleRunner;

impl Runner for ConsoleRunner {
    async fn run(&self, mut command: Command) -> crate::Result<ExitStatus> {
        let mut child = command
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        Ok(child.wait().await?)
    }
}

/// Runs the game with its output discarded.
pub struct QuietRunner;

impl Runner for QuietRunner {
    async fn run(&self, mut command: Command) -> crate::Result<ExitStatus> {
        let mut child = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(child.wait().await?)
    }
}

/// Spawns the prepared environment under the given runner and waits for
/// the game to exit.
pub async fn launch<R: Runner>(env: &LaunchEnvironment, runner: &R) -> crate::Result<ExitStatus> {
    info!(
        "launching {} in {}",
        env.main_class,
        env.game_dir.display()
    );
    runner.run(env.command()).await
}

/// Assembles the launch environment from prepared metadata, the instance
/// configuration and the session.
pub fn build_environment(
    prepared: &Prepared,
    instance: &Instance,
    dirs: &Dirs,
    options: &LaunchOptions,
) -> crate::Result<LaunchEnvironment> {
    let meta = &prepared.meta;
    let game_dir = instance.dir.clone();
    let natives_dir = dirs.natives_dir(&prepared.version_id);
    let classpath = build_classpath(prepared, instance, dirs);
    let features = feature_map(instance, options);

    let uuid = offline_uuid(&options.session.username);
    let mut values: HashMap<&str, String> = HashMap::from([
        ("auth_player_name", options.session.username.clone()),
        ("version_name", prepared.version_id.clone()),
        ("game_directory", game_dir.display().to_string()),
        ("assets_root", dirs.assets_dir().display().to_string()),
        (
            "assets_index_name",
            meta.assets.clone().unwrap_or_else(|| "legacy".into()),
        ),
        ("auth_uuid", uuid),
        (
            "auth_access_token",
            options
                .session
                .access_token
                .clone()
                .unwrap_or_else(|| "0".into()),
        ),
        ("auth_xuid", "0".into()),
        ("clientid", "0".into()),
        (
            "user_type",
            if options.session.is_online() { "msa" } else { "legacy" }.into(),
        ),
        ("user_properties", "{}".into()),
        (
            "version_type",
            meta.r#type.clone().unwrap_or_else(|| "release".into()),
        ),
        ("natives_directory", natives_dir.display().to_string()),
        ("launcher_name", env!("CARGO_PKG_NAME").into()),
        ("launcher_version", env!("CARGO_PKG_VERSION").into()),
        ("classpath", classpath.clone()),
        (
            "resolution_width",
            instance.config.resolution.width.to_string(),
        ),
        (
            "resolution_height",
            instance.config.resolution.height.to_string(),
        ),
        ("game_assets", dirs.assets_dir().display().to_string()),
    ]);
    if let Some(server) = &options.quick_play_server {
        values.insert("quickPlayMultiplayer", server.clone());
    }
    if let Some(world) = &options.quick_play_world {
        values.insert("quickPlaySingleplayer", world.clone());
    }

    let mut jvm_args = memory_args(instance);
    jvm_args.extend(
        instance
            .config
            .java_args
            .split_whitespace()
            .map(str::to_string),
    );

    let mut game_args = Vec::new();
    match (&meta.arguments, &meta.minecraft_arguments) {
        (Some(arguments), _) => {
            jvm_args.extend(render_elements(&arguments.jvm, &features, &values));
            game_args.extend(render_elements(&arguments.game, &features, &values));
        }
        (None, Some(legacy)) => {
            // Pre-1.13 templates cover game arguments only.
            jvm_args.push(format!("-Djava.library.path={}", natives_dir.display()));
            jvm_args.push("-cp".into());
            jvm_args.push(classpath);
            game_args.extend(
                legacy
                    .split_whitespace()
                    .map(|arg| substitute(arg, &values)),
            );
        }
        (None, None) => {
            jvm_args.push(format!("-Djava.library.path={}", natives_dir.display()));
            jvm_args.push("-cp".into());
            jvm_args.push(classpath);
        }
    }

    if options.disable_multiplayer {
        game_args.push("--disableMultiplayer".into());
    }
    if options.disable_chat {
        game_args.push("--disableChat".into());
    }

    Ok(LaunchEnvironment {
        java_bin: prepared.java_bin.clone(),
        jvm_args,
        main_class: meta.main_class.clone(),
        game_args,
        game_dir,
    })
}

fn memory_args(instance: &Instance) -> Vec<String> {
    let mut args = Vec::new();
    if instance.config.min_memory != 0 {
        args.push(format!("-Xms{}M", instance.config.min_memory));
    }
    if instance.config.max_memory != 0 {
        args.push(format!("-Xmx{}M", instance.config.max_memory));
    }
    args
}

/// Classpath of every applicable library artifact plus the client jar
/// (or the configured replacement jar).
fn build_classpath(prepared: &Prepared, instance: &Instance, dirs: &Dirs) -> String {
    let libraries_dir = dirs.libraries_dir();
    let mut parts: Vec<String> = prepared
        .meta
        .libraries
        .iter()
        .filter(|lib| lib.rules.parse_rule())
        .filter_map(|lib| {
            let artifact = lib.downloads.as_ref()?.artifact.as_ref()?;
            let path = artifact.path.as_ref()?;
            Some(libraries_dir.join(path).display().to_string())
        })
        .collect();

    let client_jar = if instance.config.custom_jar.is_empty() {
        dirs.version_jar_path(&instance.game_version)
    } else {
        PathBuf::from(&instance.config.custom_jar)
    };
    parts.push(client_jar.display().to_string());

    parts.join(CLASSPATH_SEPARATOR)
}

/// Feature flags consulted by conditional argument templates.
fn feature_map(instance: &Instance, options: &LaunchOptions) -> HashMap<String, bool> {
    HashMap::from([
        ("is_demo_user".into(), options.demo),
        (
            "has_custom_resolution".into(),
            instance.config.resolution.width != 0 && instance.config.resolution.height != 0,
        ),
        (
            "is_quick_play_multiplayer".into(),
            options.quick_play_server.is_some(),
        ),
        (
            "is_quick_play_singleplayer".into(),
            options.quick_play_world.is_some(),
        ),
        ("has_quick_plays_support".into(), false),
        ("is_quick_play_realms".into(), false),
    ])
}

/// Renders an argument template list: platform rules via the shared rule
/// evaluation, feature rules against the feature map, placeholders from
/// the value table.
fn render_elements(
    elements: &[Element],
    features: &HashMap<String, bool>,
    values: &HashMap<&str, String>,
) -> Vec<String> {
    let mut rendered = Vec::new();
    for element in elements {
        match element {
            Element::Simple(arg) => rendered.push(substitute(arg, values)),
            Element::Conditional { rules, value } => {
                if !rules_apply(rules, features) {
                    continue;
                }
                match value {
                    ConditionalValue::Single(arg) => rendered.push(substitute(arg, values)),
                    ConditionalValue::Many(args) => {
                        rendered.extend(args.iter().map(|arg| substitute(arg, values)));
                    }
                }
            }
        }
    }
    rendered
}

fn rules_apply(rules: &[Rule], features: &HashMap<String, bool>) -> bool {
    let feature_rules: Vec<&Rule> = rules.iter().filter(|r| r.features.is_some()).collect();
    if feature_rules.is_empty() {
        return rules.parse_rule();
    }

    feature_rules.iter().all(|rule| {
        let wanted = rule.features.as_ref().unwrap();
        let matched = wanted
            .iter()
            .all(|(name, expected)| features.get(name).copied().unwrap_or(false) == *expected);
        matched == (rule.action == crate::json::version::meta::vanilla::Action::Allow)
    })
}

fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Stable identifier for sessions that never touched an account service,
/// derived the same way the vanilla server derives offline profiles.
fn offline_uuid(username: &str) -> String {
    let digest = Md5::digest(format!("OfflinePlayer:{username}").as_bytes());
    let mut bytes: [u8; 16] = digest.into();
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceConfig;
    use crate::json::version::meta::vanilla::VersionMeta;
    use crate::minecraft::loader::Loader;

    fn prepared(meta: serde_json::Value) -> Prepared {
        let meta: VersionMeta = serde_json::from_value(meta).unwrap();
        Prepared {
            version_id: meta.id.clone(),
            meta,
            java_bin: PathBuf::from("/usr/bin/java"),
        }
    }

    fn instance() -> Instance {
        Instance {
            name: "test".into(),
            uuid: "u".into(),
            game_version: "1.21.5".into(),
            mod_loader: Loader::Vanilla,
            mod_loader_version: String::new(),
            config: InstanceConfig {
                min_memory: 1024,
                max_memory: 4096,
                ..Default::default()
            },
            dir: PathBuf::from("/data/instances/test/u"),
        }
    }

    fn modern_meta() -> serde_json::Value {
        serde_json::json!({
            "id": "1.21.5",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "24",
            "type": "release",
            "arguments": {
                "jvm": ["-cp", "${classpath}"],
                "game": [
                    "--username", "${auth_player_name}",
                    "--gameDir", "${game_directory}",
                    {
                        "rules": [{"action": "allow", "features": {"is_demo_user": true}}],
                        "value": "--demo"
                    },
                    {
                        "rules": [{"action": "allow", "features": {"is_quick_play_multiplayer": true}}],
                        "value": ["--quickPlayMultiplayer", "${quickPlayMultiplayer}"]
                    }
                ]
            },
            "libraries": [{
                "name": "a:lib:1",
                "downloads": {"artifact": {
                    "path": "a/lib/1/lib-1.jar", "sha1": "x", "size": 1,
                    "url": "https://libraries.example/lib-1.jar"
                }}
            }]
        })
    }

    #[test]
    fn substitutes_placeholders_and_memory_args() {
        let env = build_environment(
            &prepared(modern_meta()),
            &instance(),
            &Dirs::new("/data"),
            &LaunchOptions {
                session: Session::offline("Steve"),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(env.jvm_args[0], "-Xms1024M");
        assert_eq!(env.jvm_args[1], "-Xmx4096M");
        let cp_index = env.jvm_args.iter().position(|a| a == "-cp").unwrap();
        let classpath = &env.jvm_args[cp_index + 1];
        assert!(classpath.contains("lib-1.jar"));
        assert!(classpath.contains("1.21.5.jar"));

        let user_index = env.game_args.iter().position(|a| a == "--username").unwrap();
        assert_eq!(env.game_args[user_index + 1], "Steve");
        assert!(!env.game_args.contains(&"--demo".to_string()));
    }

    #[test]
    fn feature_gated_arguments_follow_options() {
        let env = build_environment(
            &prepared(modern_meta()),
            &instance(),
            &Dirs::new("/data"),
            &LaunchOptions {
                session: Session::offline("Steve"),
                demo: true,
                quick_play_server: Some("play.example.net".into()),
                disable_chat: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(env.game_args.contains(&"--demo".to_string()));
        assert!(env.game_args.contains(&"--disableChat".to_string()));
        assert!(!env.game_args.contains(&"--disableMultiplayer".to_string()));
        let qp_index = env
            .game_args
            .iter()
            .position(|a| a == "--quickPlayMultiplayer")
            .unwrap();
        assert_eq!(env.game_args[qp_index + 1], "play.example.net");
    }

    #[test]
    fn legacy_template_builds_classpath_jvm_args() {
        let env = build_environment(
            &prepared(serde_json::json!({
                "id": "1.8.9",
                "mainClass": "net.minecraft.client.main.Main",
                "minecraftArguments": "--username ${auth_player_name} --version ${version_name}",
                "libraries": []
            })),
            &instance(),
            &Dirs::new("/data"),
            &LaunchOptions {
                session: Session::offline("Alex"),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(env.jvm_args.iter().any(|a| a.starts_with("-Djava.library.path=")));
        assert!(env.jvm_args.contains(&"-cp".to_string()));
        assert_eq!(env.game_args, vec!["--username", "Alex", "--version", "1.8.9"]);
    }

    #[test]
    fn custom_jar_replaces_client_jar_on_classpath() {
        let mut inst = instance();
        inst.config.custom_jar = "/mods/custom-client.jar".into();
        let env = build_environment(
            &prepared(modern_meta()),
            &inst,
            &Dirs::new("/data"),
            &LaunchOptions::default(),
        )
        .unwrap();

        let cp_index = env.jvm_args.iter().position(|a| a == "-cp").unwrap();
        assert!(env.jvm_args[cp_index + 1].contains("custom-client.jar"));
        assert!(!env.jvm_args[cp_index + 1].contains("1.21.5.jar"));
    }

    #[test]
    fn offline_uuid_is_stable_and_well_formed() {
        let a = offline_uuid("Steve");
        let b = offline_uuid("Steve");
        assert_eq!(a, b);
        assert_ne!(a, offline_uuid("Alex"));
        assert_eq!(a.len(), 36);
        assert_eq!(&a[14..15], "3");
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let values = HashMap::from([("known", "value".to_string())]);
        assert_eq!(substitute("--a ${known} ${unknown}", &values), "--a value ${unknown}");
    }
}
