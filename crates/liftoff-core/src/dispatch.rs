//! Command dispatcher
//!
//! One entry point per external operation. Every operation is a short, linear
//! sequence of collaborator calls returning `Result<T>`; nothing here reports
//! errors or exits. The outermost caller applies [`settle`] to decide that.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::BuildToolConfig;
use crate::error::{Result, TestError};
use crate::output::Output;
use crate::traits::{AutomationServer, BuildTool, TestSuite};
use crate::types::{BuildOutput, Capabilities, LoginMode, Platform};

/// Stateless dispatcher over injected collaborators
#[derive(Clone)]
pub struct Dispatcher {
    build_tool: Arc<dyn BuildTool>,
    automation: Arc<dyn AutomationServer>,
    tests: Arc<dyn TestSuite>,
    output: Arc<dyn Output>,
}

impl Dispatcher {
    pub fn new(
        build_tool: Arc<dyn BuildTool>,
        automation: Arc<dyn AutomationServer>,
        tests: Arc<dyn TestSuite>,
        output: Arc<dyn Output>,
    ) -> Self {
        Self {
            build_tool,
            automation,
            tests,
            output,
        }
    }

    /// The output channel operations announce through
    pub fn output(&self) -> &Arc<dyn Output> {
        &self.output
    }

    /// Log in (production), install the CLI, then install the SDK.
    #[instrument(skip_all)]
    pub async fn setup_environment(&self, config: &BuildToolConfig) -> Result<()> {
        self.build_tool.login(config, LoginMode::Production).await?;
        debug!("logged in");
        self.build_tool.install_cli(config).await?;
        debug!("cli installed");
        self.build_tool.install_sdk(config).await?;
        info!("environment ready");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn start_automation_server(&self, hostname: &str, port: u16) -> Result<()> {
        self.automation.run_server(hostname, port).await
    }

    #[instrument(skip(self))]
    pub async fn stop_automation_server(&self) -> Result<()> {
        self.automation.quit_server().await
    }

    /// Collect and run the tests under `directory`.
    ///
    /// Zero collected tests is an error, not a vacuous success.
    #[instrument(skip(self, directory), fields(directory = %directory.display()))]
    pub async fn run_tests(&self, directory: &Path) -> Result<()> {
        let display = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| directory.display().to_string());
        self.output
            .banner(&format!("Running test directory {}", display));

        let tests = self.tests.collect_tests(directory).await?;
        if tests.is_empty() {
            return Err(TestError::NoTestsFound {
                directory: directory.to_path_buf(),
            }
            .into());
        }

        info!(count = tests.len(), "collected tests");
        self.tests.run(&tests).await
    }

    /// Build the app; the build tool's result is returned untouched.
    #[instrument(skip(self, directory, platform, args), fields(directory = %directory.display(), platform = %platform))]
    pub async fn build_app(
        &self,
        directory: &Path,
        platform: Platform,
        args: &[String],
    ) -> Result<BuildOutput> {
        self.build_tool.build(directory, platform, args).await
    }

    #[instrument(skip_all)]
    pub async fn start_client(&self, capabilities: &Capabilities) -> Result<()> {
        self.automation.start_client(capabilities).await
    }

    #[instrument(skip(self))]
    pub async fn stop_client(&self) -> Result<()> {
        self.automation.stop_client().await
    }

    #[instrument(skip_all, fields(arg_count = args.len()))]
    pub async fn run_build_tool(&self, args: &[String]) -> Result<()> {
        self.build_tool.runner(args).await
    }

    #[instrument(skip(self, directory, platform), fields(directory = %directory.display(), platform = %platform))]
    pub async fn create_app_path(
        &self,
        directory: &Path,
        platform: Platform,
        app_name: &str,
    ) -> Result<()> {
        let path = self
            .build_tool
            .create_app_path(directory, platform, app_name)
            .await?;
        info!(path = %path.display(), "app path ready");
        Ok(())
    }
}

/// Receives the exit code of a fatal error
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Fatal boundary for operation results.
///
/// `Ok` passes through. `Err` is reported once on `output`, then `terminator`
/// is invoked once with the error's exit code. `None` is returned when the
/// terminator returns, which lets the caller flush state before exiting.
pub fn settle<T>(
    result: Result<T>,
    output: &dyn Output,
    terminator: &dyn Terminator,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            output.error(&err);
            terminator.terminate(err.exit_code());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{AutomationError, BuildToolError, LiftoffError};
    use crate::output::{CollectingOutput, OutputEvent};
    use crate::types::TestFile;

    /// Shared call log for all fakes, so cross-collaborator order is visible
    #[derive(Default)]
    struct Log {
        calls: Mutex<Vec<String>>,
        fail_on: Mutex<Option<&'static str>>,
    }

    impl Log {
        fn record(&self, call: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if *self.fail_on.lock().unwrap() == Some(call) {
                return Err(LiftoffError::other(format!("{} failed", call)));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn fail_on(&self, call: &'static str) {
            *self.fail_on.lock().unwrap() = Some(call);
        }
    }

    struct FakeBuildTool {
        log: Arc<Log>,
        modes: Mutex<Vec<LoginMode>>,
    }

    fn sample_build_output() -> BuildOutput {
        BuildOutput {
            platform: Platform::Android,
            project_dir: PathBuf::from("/apps/kitchensink"),
            exit_code: Some(0),
            stdout: "BUILD SUCCESSFUL".to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(1234),
        }
    }

    #[async_trait]
    impl BuildTool for FakeBuildTool {
        async fn login(&self, _config: &BuildToolConfig, mode: LoginMode) -> Result<()> {
            self.modes.lock().unwrap().push(mode);
            self.log.record("login")
        }

        async fn install_cli(&self, _config: &BuildToolConfig) -> Result<()> {
            self.log.record("install_cli")
        }

        async fn install_sdk(&self, _config: &BuildToolConfig) -> Result<()> {
            self.log.record("install_sdk")
        }

        async fn build(
            &self,
            _dir: &Path,
            _platform: Platform,
            _args: &[String],
        ) -> Result<BuildOutput> {
            self.log.record("build")?;
            Ok(sample_build_output())
        }

        async fn runner(&self, _args: &[String]) -> Result<()> {
            self.log.record("runner")
        }

        async fn create_app_path(
            &self,
            dir: &Path,
            _platform: Platform,
            app_name: &str,
        ) -> Result<PathBuf> {
            self.log.record("create_app_path")?;
            Ok(dir.join(app_name))
        }
    }

    struct FakeAutomation {
        log: Arc<Log>,
        capabilities: Mutex<Vec<Capabilities>>,
    }

    #[async_trait]
    impl AutomationServer for FakeAutomation {
        async fn run_server(&self, _hostname: &str, _port: u16) -> Result<()> {
            self.log.record("run_server")
        }

        async fn quit_server(&self) -> Result<()> {
            self.log.record("quit_server")
        }

        async fn start_client(&self, capabilities: &Capabilities) -> Result<()> {
            self.capabilities.lock().unwrap().push(capabilities.clone());
            self.log.record("start_client")
        }

        async fn stop_client(&self) -> Result<()> {
            self.log.record("stop_client")
        }
    }

    struct FakeTests {
        log: Arc<Log>,
        collected: Vec<TestFile>,
        runs: Mutex<Vec<Vec<TestFile>>>,
    }

    #[async_trait]
    impl TestSuite for FakeTests {
        async fn collect_tests(&self, _dir: &Path) -> Result<Vec<TestFile>> {
            self.log.record("collect_tests")?;
            Ok(self.collected.clone())
        }

        async fn run(&self, tests: &[TestFile]) -> Result<()> {
            self.runs.lock().unwrap().push(tests.to_vec());
            self.log.record("run")
        }
    }

    struct Harness {
        log: Arc<Log>,
        build_tool: Arc<FakeBuildTool>,
        automation: Arc<FakeAutomation>,
        tests: Arc<FakeTests>,
        output: Arc<CollectingOutput>,
        dispatcher: Dispatcher,
    }

    fn harness(collected: Vec<TestFile>) -> Harness {
        let log = Arc::new(Log::default());
        let build_tool = Arc::new(FakeBuildTool {
            log: log.clone(),
            modes: Mutex::new(Vec::new()),
        });
        let automation = Arc::new(FakeAutomation {
            log: log.clone(),
            capabilities: Mutex::new(Vec::new()),
        });
        let tests = Arc::new(FakeTests {
            log: log.clone(),
            collected,
            runs: Mutex::new(Vec::new()),
        });
        let output = Arc::new(CollectingOutput::default());
        let dispatcher = Dispatcher::new(
            build_tool.clone(),
            automation.clone(),
            tests.clone(),
            output.clone(),
        );
        Harness {
            log,
            build_tool,
            automation,
            tests,
            output,
            dispatcher,
        }
    }

    /// Records terminate calls alongside the output events they follow
    struct RecordingTerminator {
        output: Arc<CollectingOutput>,
        calls: Mutex<Vec<(i32, usize)>>,
    }

    impl RecordingTerminator {
        fn new(output: Arc<CollectingOutput>) -> Self {
            Self {
                output,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(i32, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Terminator for RecordingTerminator {
        fn terminate(&self, code: i32) {
            let events_so_far = self.output.events().len();
            self.calls.lock().unwrap().push((code, events_so_far));
        }
    }

    #[tokio::test]
    async fn test_setup_environment_order() {
        let h = harness(vec![]);
        h.dispatcher
            .setup_environment(&BuildToolConfig::default())
            .await
            .unwrap();

        assert_eq!(h.log.calls(), vec!["login", "install_cli", "install_sdk"]);
        assert_eq!(
            *h.build_tool.modes.lock().unwrap(),
            vec![LoginMode::Production]
        );
        assert!(h.output.errors().is_empty());
    }

    #[tokio::test]
    async fn test_setup_environment_login_failure_stops_sequence() {
        let h = harness(vec![]);
        h.log.fail_on("login");

        let err = h
            .dispatcher
            .setup_environment(&BuildToolConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "login failed");
        assert_eq!(h.log.calls(), vec!["login"]);
    }

    #[tokio::test]
    async fn test_setup_environment_sdk_failure_after_cli() {
        let h = harness(vec![]);
        h.log.fail_on("install_sdk");

        assert!(h
            .dispatcher
            .setup_environment(&BuildToolConfig::default())
            .await
            .is_err());
        assert_eq!(h.log.calls(), vec!["login", "install_cli", "install_sdk"]);
    }

    #[tokio::test]
    async fn test_run_tests_empty_is_no_tests_found() {
        let h = harness(vec![]);

        let err = h
            .dispatcher
            .run_tests(Path::new("/some/dir"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LiftoffError::Test(TestError::NoTestsFound { ref directory }) if directory == Path::new("/some/dir")
        ));
        assert_eq!(err.to_string(), "No Tests Found!");
        assert_eq!(h.log.calls(), vec!["collect_tests"]);
        assert!(h.tests.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_tests_runs_collected_once() {
        let t1 = TestFile::new("/some/dir/login.js");
        let t2 = TestFile::new("/some/dir/tabs.js");
        let h = harness(vec![t1.clone(), t2.clone()]);

        h.dispatcher
            .run_tests(Path::new("/some/dir"))
            .await
            .unwrap();

        assert_eq!(*h.tests.runs.lock().unwrap(), vec![vec![t1, t2]]);
        assert_eq!(
            h.output.events(),
            vec![OutputEvent::Banner("Running test directory dir".to_string())]
        );
    }

    #[tokio::test]
    async fn test_build_app_returns_collaborator_result() {
        let h = harness(vec![]);
        let args = vec!["--log-level".to_string(), "trace".to_string()];

        let result = h
            .dispatcher
            .build_app(Path::new("/apps/kitchensink"), Platform::Android, &args)
            .await
            .unwrap();

        assert_eq!(result, sample_build_output());
        assert_eq!(h.log.calls(), vec!["build"]);
    }

    #[tokio::test]
    async fn test_single_call_operations_delegate() {
        let h = harness(vec![]);
        let caps = Capabilities::new().with("platformName", "iOS");

        h.dispatcher
            .start_automation_server("0.0.0.0", 4723)
            .await
            .unwrap();
        h.dispatcher.start_client(&caps).await.unwrap();
        h.dispatcher.stop_client().await.unwrap();
        h.dispatcher.stop_automation_server().await.unwrap();
        h.dispatcher
            .run_build_tool(&["info".to_string()])
            .await
            .unwrap();
        h.dispatcher
            .create_app_path(Path::new("/apps/kitchensink"), Platform::Ios, "KitchenSink")
            .await
            .unwrap();

        assert_eq!(
            h.log.calls(),
            vec![
                "run_server",
                "start_client",
                "stop_client",
                "quit_server",
                "runner",
                "create_app_path"
            ]
        );
        assert_eq!(*h.automation.capabilities.lock().unwrap(), vec![caps]);
        assert!(h.output.events().is_empty());
    }

    #[tokio::test]
    async fn test_settle_success_never_touches_error_path() {
        let h = harness(vec![]);
        let terminator = RecordingTerminator::new(h.output.clone());

        let result = h
            .dispatcher
            .build_app(Path::new("/apps/kitchensink"), Platform::Android, &[])
            .await;
        let value = settle(result, h.output.as_ref(), &terminator);

        assert_eq!(value, Some(sample_build_output()));
        assert!(h.output.errors().is_empty());
        assert!(terminator.calls().is_empty());
    }

    /// Run the operation that reaches `failing` first; failures are mapped to `()`
    async fn run_operation(h: &Harness, failing: &str) -> Result<()> {
        let dir = Path::new("/apps/kitchensink");
        match failing {
            "login" | "install_cli" | "install_sdk" => {
                h.dispatcher
                    .setup_environment(&BuildToolConfig::default())
                    .await
            }
            "run_server" => h.dispatcher.start_automation_server("localhost", 4723).await,
            "quit_server" => h.dispatcher.stop_automation_server().await,
            "collect_tests" | "run" => h.dispatcher.run_tests(Path::new("/some/dir")).await,
            "build" => h
                .dispatcher
                .build_app(dir, Platform::Android, &[])
                .await
                .map(|_| ()),
            "start_client" => h.dispatcher.start_client(&Capabilities::new()).await,
            "stop_client" => h.dispatcher.stop_client().await,
            "runner" => h.dispatcher.run_build_tool(&[]).await,
            "create_app_path" => {
                h.dispatcher
                    .create_app_path(dir, Platform::Ios, "KitchenSink")
                    .await
            }
            other => panic!("no operation calls {}", other),
        }
    }

    #[tokio::test]
    async fn test_settle_reports_once_then_terminates_once() {
        let collaborator_calls = [
            "login",
            "install_cli",
            "install_sdk",
            "run_server",
            "quit_server",
            "collect_tests",
            "run",
            "build",
            "start_client",
            "stop_client",
            "runner",
            "create_app_path",
        ];

        for failing in collaborator_calls {
            let h = harness(vec![TestFile::new("/some/dir/login.js")]);
            h.log.fail_on(failing);
            let terminator = RecordingTerminator::new(h.output.clone());

            let result = run_operation(&h, failing).await;
            assert!(settle(result, h.output.as_ref(), &terminator).is_none());

            assert_eq!(
                h.output.errors(),
                vec![format!("{} failed", failing)],
                "{}",
                failing
            );
            // run_tests announces a banner before collecting
            let banners = usize::from(matches!(failing, "collect_tests" | "run"));
            // terminate ran once, after exactly one error event
            assert_eq!(terminator.calls(), vec![(1, banners + 1)], "{}", failing);
        }
    }

    #[tokio::test]
    async fn test_run_tests_collect_failure_skips_run() {
        let h = harness(vec![TestFile::new("/some/dir/login.js")]);
        h.log.fail_on("collect_tests");

        let err = h
            .dispatcher
            .run_tests(Path::new("/some/dir"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "collect_tests failed");
        assert!(h.tests.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_app_failure_is_returned() {
        let h = harness(vec![]);
        h.log.fail_on("build");

        let err = h
            .dispatcher
            .build_app(Path::new("/apps/kitchensink"), Platform::Android, &[])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "build failed");
        assert_eq!(h.log.calls(), vec!["build"]);
    }

    #[tokio::test]
    async fn test_create_app_path_failure_is_returned() {
        let h = harness(vec![]);
        h.log.fail_on("create_app_path");

        let err = h
            .dispatcher
            .create_app_path(Path::new("/apps/kitchensink"), Platform::Ios, "KitchenSink")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "create_app_path failed");
    }

    #[tokio::test]
    async fn test_settle_no_tests_found_exit_code() {
        let h = harness(vec![]);
        let terminator = RecordingTerminator::new(h.output.clone());

        let result = h.dispatcher.run_tests(Path::new("/some/dir")).await;
        assert!(settle(result, h.output.as_ref(), &terminator).is_none());

        assert_eq!(h.output.errors(), vec!["No Tests Found!".to_string()]);
        // banner, then error, then terminate
        assert_eq!(terminator.calls(), vec![(6, 2)]);
    }

    #[tokio::test]
    async fn test_settle_typed_error_codes() {
        let output = Arc::new(CollectingOutput::default());
        let terminator = RecordingTerminator::new(output.clone());

        settle::<()>(
            Err(AutomationError::NoSession.into()),
            output.as_ref(),
            &terminator,
        );
        settle::<()>(
            Err(BuildToolError::MissingCredentials("password").into()),
            output.as_ref(),
            &terminator,
        );

        assert_eq!(terminator.calls(), vec![(4, 1), (3, 2)]);
    }
}
