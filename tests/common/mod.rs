//! Recording command runner and project fixtures shared by integration tests

#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tempfile::TempDir;
use tokio::io::{duplex, AsyncReadExt, DuplexStream};

use create_codepush_app::commands::create::CreateOptions;
use create_codepush_app::config::{Config, HostOs, LinkConfig};
use create_codepush_app::runner::{CommandOutput, CommandRunner, Invocation, Session};

pub const APP: &str = "DemoApp";

type Responder = Box<dyn Fn(&Invocation) -> Option<CommandOutput> + Send + Sync>;
type Hook = Box<dyn Fn(&Invocation) + Send + Sync>;

/// What the mocked link tool prints and how it exits
pub enum LinkBehavior {
    Output(Vec<u8>, i32),
    /// Never prints anything and never closes stdout
    Silent,
}

pub struct MockRunner {
    calls: Mutex<Vec<Invocation>>,
    responders: Mutex<Vec<Responder>>,
    hooks: Mutex<Vec<Hook>>,
    link: LinkBehavior,
    link_stdin: Mutex<Vec<DuplexStream>>,
    silent_writers: Mutex<Vec<DuplexStream>>,
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// Standard `code-push deployment ls` JSON for an app
pub fn deployments_json(name: &str) -> String {
    format!(
        r#"[{{"name":"Production","key":"prod-{name}"}},{{"name":"Staging","key":"staging-{name}"}}]"#
    )
}

/// Link tool output that asks both key prompts
pub fn prompting_output() -> Vec<u8> {
    let link = LinkConfig::default();
    format!(
        "rnpm-install info Linking react-native-code-push\n? {} \n? {} \n",
        link.android_prompt, link.ios_prompt
    )
    .into_bytes()
}

impl MockRunner {
    pub fn new() -> Self {
        let runner = Self {
            calls: Mutex::new(Vec::new()),
            responders: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            link: LinkBehavior::Output(prompting_output(), 0),
            link_stdin: Mutex::new(Vec::new()),
            silent_writers: Mutex::new(Vec::new()),
        };

        runner.respond(|inv| {
            if inv.matches("code-push", &["deployment", "ls"]) {
                Some(ok(&deployments_json(&inv.args[2])))
            } else if inv.matches("npm", &["view"]) {
                let package = inv.args[1].as_str();
                if package.starts_with("react-native-code-push") {
                    Some(ok("5.0.0\n"))
                } else {
                    Some(ok("0.45.1\n"))
                }
            } else if inv.matches("whoami", &[]) {
                Some(ok("tester\n"))
            } else {
                None
            }
        });

        runner
    }

    pub fn with_link(mut self, link: LinkBehavior) -> Self {
        self.link = link;
        self
    }

    /// Add a responder; later responders take precedence
    pub fn respond(&self, f: impl Fn(&Invocation) -> Option<CommandOutput> + Send + Sync + 'static) {
        self.responders.lock().unwrap().push(Box::new(f));
    }

    /// Run `f` whenever a command is invoked, before it "executes"
    pub fn on_call(&self, f: impl Fn(&Invocation) + Send + Sync + 'static) {
        self.hooks.lock().unwrap().push(Box::new(f));
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, program: &str, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|inv| inv.matches(program, prefix))
            .count()
    }

    pub fn position(&self, program: &str, prefix: &[&str]) -> Option<usize> {
        self.calls()
            .iter()
            .position(|inv| inv.matches(program, prefix))
    }

    /// Lines the link step wrote to the link tool
    pub async fn link_replies(&self) -> String {
        let streams: Vec<DuplexStream> = self.link_stdin.lock().unwrap().drain(..).collect();
        let mut out = String::new();
        for mut stream in streams {
            stream.read_to_string(&mut out).await.unwrap();
        }
        out
    }

    fn record(&self, invocation: &Invocation) -> CommandOutput {
        self.calls.lock().unwrap().push(invocation.clone());
        for hook in self.hooks.lock().unwrap().iter() {
            hook(invocation);
        }

        if invocation.matches("react-native", &["init"]) {
            fake_project(&invocation.cwd.join(&invocation.args[1]), &invocation.args[1]);
        }

        let responders = self.responders.lock().unwrap();
        responders
            .iter()
            .rev()
            .find_map(|r| r(invocation))
            .unwrap_or_default()
    }
}

impl CommandRunner for MockRunner {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        Ok(self.record(invocation))
    }

    async fn status(&self, invocation: &Invocation) -> Result<i32> {
        Ok(self.record(invocation).exit_code)
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Session> {
        self.record(invocation);

        let (stdin, replies) = duplex(4096);
        self.link_stdin.lock().unwrap().push(replies);

        match &self.link {
            LinkBehavior::Output(bytes, code) => {
                Ok(Session::detached(stdin, Cursor::new(bytes.clone()), *code))
            }
            LinkBehavior::Silent => {
                let (writer, stdout) = duplex(64);
                self.silent_writers.lock().unwrap().push(writer);
                Ok(Session::detached(stdin, stdout, 0))
            }
        }
    }
}

/// Minimal tree `react-native init` would leave behind
pub fn fake_project(dir: &Path, app: &str) {
    fs::create_dir_all(dir.join("ios").join(app)).unwrap();
    fs::create_dir_all(dir.join("node_modules/react-native/scripts")).unwrap();
    fs::create_dir_all(dir.join("node_modules/react-native/packager")).unwrap();

    fs::write(dir.join("index.ios.js"), "// generated ios entry\n").unwrap();
    fs::write(dir.join("index.android.js"), "// generated android entry\n").unwrap();
    fs::write(
        dir.join("ios").join(app).join("AppDelegate.m"),
        "NSURL *jsCodeLocation;\n#ifdef DEBUG\n  jsCodeLocation = [provider url];\n#else\n  jsCodeLocation = [bundle url];\n#endif\n",
    )
    .unwrap();

    let script: String = (1..=24).map(|n| format!("# line {}\n", n)).collect();
    fs::write(
        dir.join("node_modules/react-native/scripts/react-native-xcode.sh"),
        &script,
    )
    .unwrap();
    fs::write(
        dir.join("node_modules/react-native/packager/react-native-xcode.sh"),
        &script,
    )
    .unwrap();
    fs::write(
        dir.join("node_modules/react-native/react.gradle"),
        "def devEnabled = !targetName.toLowerCase().contains(\"release\")\n",
    )
    .unwrap();
}

/// Fixture directory with demo sources and a nested images tree
pub fn write_fixtures(dir: &Path) {
    fs::create_dir_all(dir.join("images/nested")).unwrap();
    fs::write(
        dir.join("demo.js"),
        "class CodePushDemoApp extends Component {}\n\
         AppRegistry.registerComponent('CodePushDemoApp', () => CodePushDemoApp);\n\
         import codePush from 'react-native-code-push';\n",
    )
    .unwrap();
    fs::write(dir.join("index.ios.js"), "import './demo';\n").unwrap();
    fs::write(dir.join("index.android.js"), "import './demo';\n").unwrap();
    fs::write(dir.join("images/laptop.png"), b"\x89PNG").unwrap();
    fs::write(dir.join("images/nested/spinner.png"), b"\x01\x02\x03").unwrap();
}

/// Work directory containing the default fixture folder
pub fn setup_work_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_fixtures(&dir.path().join("CodePushDemoApp"));
    dir
}

pub fn options(work_dir: &Path, host: HostOs) -> CreateOptions {
    let mut config = Config::default();
    config.link.timeout = 1;

    CreateOptions {
        app_name: APP.to_string(),
        react_native_version: Some("react-native@0.45.1".to_string()),
        code_push_version: Some("react-native-code-push@5.0.0".to_string()),
        work_dir: work_dir.to_path_buf(),
        host,
        skip_patches: false,
        config,
    }
}
