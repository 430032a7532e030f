use std::time::{Duration, Instant};

use kiln_kernel::channel::{IntrospectReply, IntrospectRequest};
use kiln_kernel::wire::{read_frame, write_frame};
use kiln_kernel::{
	Channel, CodeBlock, CodeOrigin, Frame, GuiToolkit, InterpreterState, KernelIo, Outcome, Reply, RequestId,
	RequesterId, StartupInfo,
};
use kiln_primitives::{Key, KeyCode, TextRegion};
use kiln_shell::{KeyOutcome, Lifecycle, Lookup, SHELL_VIEW, SessionConfig, ShellError, ShellEvent, ShellSession};
use serde_json::{Value as JsonValue, json};
use tokio::io::{BufReader, DuplexStream, ReadHalf, WriteHalf};

struct FakeKernel {
	reader: BufReader<ReadHalf<DuplexStream>>,
	writer: WriteHalf<DuplexStream>,
	buf: Vec<u8>,
}

impl FakeKernel {
	async fn recv(&mut self) -> Frame {
		tokio::time::timeout(Duration::from_secs(5), read_frame(&mut self.reader, &mut self.buf))
			.await
			.expect("no frame from the shell")
			.unwrap()
			.expect("shell closed the connection")
	}

	async fn send(&mut self, frame: Frame) {
		write_frame(&mut self.writer, &frame).await.unwrap();
	}

	async fn text(&mut self, channel: Channel, text: &str) {
		self.send(Frame::text(channel, text)).await;
	}

	async fn recv_request(&mut self) -> IntrospectRequest {
		let frame = self.recv().await;
		assert_eq!(frame.channel, Channel::Introspect);
		frame.decode().unwrap()
	}

	async fn reply(&mut self, id: RequestId, result: JsonValue) {
		let reply = IntrospectReply { id, result };
		self.send(Frame::json(Channel::IntrospectReply, &reply).unwrap()).await;
	}
}

fn connect() -> (ShellSession, FakeKernel) {
	let (client, kernel) = tokio::io::duplex(64 * 1024);
	let (read, write) = tokio::io::split(client);
	let info = StartupInfo {
		start_dir: Some("/work".into()),
		..StartupInfo::default()
	};
	let session = ShellSession::connect(KernelIo::new(read, write), &info, SessionConfig::default()).unwrap();
	let (kernel_read, kernel_write) = tokio::io::split(kernel);
	let kernel = FakeKernel {
		reader: BufReader::new(kernel_read),
		writer: kernel_write,
		buf: Vec::new(),
	};
	(session, kernel)
}

/// Ticks until `done` holds, waiting for kernel frames in between.
async fn tick_until(session: &mut ShellSession, mut done: impl FnMut(&ShellSession) -> bool) {
	tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			session.tick(Instant::now()).unwrap();
			if done(session) {
				break;
			}
			session.readable().await;
		}
	})
	.await
	.expect("session did not reach the expected state");
}

/// Completes the handshake and shows the first prompt.
async fn start(session: &mut ShellSession, kernel: &mut FakeKernel) {
	let handshake = kernel.recv().await;
	assert_eq!(handshake.channel, Channel::Startup);
	let mut reply = handshake.payload;
	reply["version"] = json!([3, 12, 1, "final", 0]);
	reply["builtins"] = json!(["len", "print", "pow"]);
	reply["keywords"] = json!(["def", "pass"]);
	kernel.send(Frame::json(Channel::Startup, &reply).unwrap()).await;
	kernel.text(Channel::HeartbeatStatus, "Ready").await;
	kernel.text(Channel::Prompt, ">>> ").await;
	tick_until(session, |s| s.buffer().prompt() == ">>> " && s.startup().is_some()).await;
}

fn all_text(session: &ShellSession) -> String {
	session.buffer().text().to_string()
}

fn type_line(session: &mut ShellSession, line: &str) {
	for c in line.chars() {
		session.handle_key(Key::char(c)).unwrap();
	}
	let outcome = session.handle_key(Key::new(KeyCode::Enter)).unwrap();
	assert_eq!(outcome, KeyOutcome::Submit(line.trim_end().to_owned()));
}

#[tokio::test]
async fn startup_handshake() {
	let (mut session, mut kernel) = connect();
	let handshake = kernel.recv().await;
	assert_eq!(handshake.channel, Channel::Startup);
	let info: StartupInfo = handshake.decode().unwrap();
	assert_eq!(info.start_dir.as_deref(), Some("/work"));
	assert_eq!(info.gui, GuiToolkit::None);

	kernel
		.send(
			Frame::json(
				Channel::Startup,
				&json!({"gui": "NONE", "startDir": "/work", "version": [3, 12, 1, "final", 0], "builtins": ["len"]}),
			)
			.unwrap(),
		)
		.await;
	tick_until(&mut session, |s| s.startup().is_some()).await;

	assert_eq!(session.startup().unwrap().builtins, ["len"]);
	assert_eq!(
		session.take_events(),
		[ShellEvent::Started {
			version: "3.12.1".into()
		}]
	);
	assert_eq!(session.lifecycle(), Lifecycle::Running);
}

#[tokio::test]
async fn commands_are_sent_and_echoed() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;
	assert!(
		session
			.take_events()
			.contains(&ShellEvent::StateChanged(InterpreterState::Ready))
	);

	type_line(&mut session, "x = 1");
	assert_eq!(kernel.recv().await, Frame::text(Channel::Stdin, "x = 1\n"));
	assert_eq!(all_text(&session), ">>> ");
	assert_eq!(session.buffer().history().entries(), ["x = 1"]);

	kernel.text(Channel::StdinEcho, "x = 1\n").await;
	kernel.text(Channel::Prompt, ">>> ").await;
	tick_until(&mut session, |s| all_text(s) == ">>> x = 1\n>>> ").await;

	type_line(&mut session, "print(x)");
	assert_eq!(kernel.recv().await, Frame::text(Channel::Stdin, "print(x)\n"));
	kernel.text(Channel::StdinEcho, "print(x)\n").await;
	kernel.text(Channel::Stdout, "1\n").await;
	kernel.text(Channel::Prompt, ">>> ").await;
	tick_until(&mut session, |s| all_text(s).ends_with("print(x)\n1\n>>> ")).await;
	assert_eq!(session.buffer().edit_text(), "");
}

#[tokio::test]
async fn magic_commands_are_rewritten() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	type_line(&mut session, "len?");
	assert_eq!(kernel.recv().await, Frame::text(Channel::Stdin, "print(len.__doc__)\n"));

	type_line(&mut session, "db up");
	assert_eq!(kernel.recv().await, Frame::text(Channel::Control, "DEBUG UP"));
	assert!(all_text(&session).ends_with(">>> db up\n>>> "));

	session.take_events();
	type_line(&mut session, "open os.path");
	assert_eq!(
		session.take_events(),
		[ShellEvent::Open {
			target: "os.path".into(),
			directory: false
		}]
	);
}

#[tokio::test]
async fn debugger_focus_uses_the_reported_frame() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	kernel
		.send(
			Frame::json(
				Channel::DebugStatus,
				&json!({"index": 1, "frames": ["File \"<console>\", line 1", "File \"/p/a.py\", line 7, in f"]}),
			)
			.unwrap(),
		)
		.await;
	tick_until(&mut session, |s| s.debug_state().is_some()).await;

	session.take_events();
	type_line(&mut session, "db focus");
	assert_eq!(
		session.take_events(),
		[ShellEvent::Focus {
			file: "/p/a.py".into(),
			line: 7
		}]
	);
}

#[tokio::test]
async fn code_blocks_carry_their_offset() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	session
		.execute_code("x = 1\n\n1/0\n", "/tmp/m.py", CodeOrigin::Lines { first: 9 })
		.unwrap();
	let frame = kernel.recv().await;
	assert_eq!(frame.channel, Channel::Code);
	let block: CodeBlock = frame.decode().unwrap();
	assert_eq!(block.fname, "/tmp/m.py");
	assert_eq!(block.lineno, 9);
	assert!(all_text(&session).starts_with("[executing lines 10 to 12 of \"m.py\"]\n"));

	kernel
		.text(Channel::Stderr, "  File \"/tmp/m.py+9\", line 3, in <module>\n")
		.await;
	tick_until(&mut session, |s| all_text(s).contains("<module>")).await;
	assert!(all_text(&session).contains("  File \"/tmp/m.py\", line 12, in <module>\n"));
	assert!(all_text(&session).ends_with(">>> "));
}

#[tokio::test]
async fn completions_merge_builtins_and_are_cached() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	let mut ac = session.complete("x = pr", SHELL_VIEW, Instant::now()).unwrap();
	assert_eq!(ac.poll(), Lookup::Pending);
	let request = kernel.recv_request().await;
	assert_eq!(request.request, "ATTRIBUTES ");
	kernel.reply(request.id, json!(["prime", "x"])).await;
	tick_until(&mut session, |s| s.pending_requests() == 0).await;
	assert_eq!(ac.poll(), Lookup::Ready(vec!["prime".to_owned(), "print".to_owned()]));

	let mut again = session.complete("pri", SHELL_VIEW, Instant::now()).unwrap();
	assert_eq!(session.pending_requests(), 0);
	assert_eq!(again.poll(), Lookup::Ready(vec!["prime".to_owned(), "print".to_owned()]));
}

#[tokio::test]
async fn replies_for_inactive_views_are_dropped() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	let editor = RequesterId(7);
	let mut tip = session.call_tip("n = len(", editor, Instant::now()).unwrap().unwrap();
	assert_eq!(tip.callee(), "len");
	let request = kernel.recv_request().await;
	assert_eq!(request.request, "SIGNATURE len");
	kernel.reply(request.id, json!("len(obj, /)")).await;
	tick_until(&mut session, |s| s.pending_requests() == 0).await;
	assert_eq!(tip.poll(), Lookup::Cancelled);

	session.set_active_views([SHELL_VIEW, editor]);
	let mut handle = session.eval("boom", editor, Instant::now()).unwrap();
	let request = kernel.recv_request().await;
	assert_eq!(request.request, "EVAL boom");
	kernel.reply(request.id, json!("<error>")).await;
	tick_until(&mut session, |s| s.pending_requests() == 0).await;
	assert_eq!(handle.try_outcome(), Some(Outcome::Delivered(Reply::Failed)));
}

#[tokio::test]
async fn requests_queue_behind_the_one_in_flight() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	let mut first = session.eval("a", SHELL_VIEW, Instant::now()).unwrap();
	let mut second = session.eval("b", SHELL_VIEW, Instant::now()).unwrap();
	assert_eq!(session.pending_requests(), 2);

	let request = kernel.recv_request().await;
	assert_eq!(request.request, "EVAL a");
	kernel.reply(request.id, json!(1)).await;
	tick_until(&mut session, |s| s.pending_requests() == 1).await;

	let request = kernel.recv_request().await;
	assert_eq!(request.request, "EVAL b");
	kernel.reply(request.id, json!(2)).await;
	tick_until(&mut session, |s| s.pending_requests() == 0).await;

	assert_eq!(first.try_outcome(), Some(Outcome::Delivered(Reply::Value(json!(1)))));
	assert_eq!(second.try_outcome(), Some(Outcome::Delivered(Reply::Value(json!(2)))));
}

#[tokio::test]
async fn cancelled_queued_requests_are_forgotten() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;
	let now = Instant::now();

	let _attrs = session.complete("os.pa", SHELL_VIEW, now).unwrap();
	let request = kernel.recv_request().await;
	assert_eq!(request.request, "ATTRIBUTES os");

	let editor = RequesterId(9);
	for i in 0..20 {
		let tip = session.call_tip(&format!("f{i}("), editor, now).unwrap();
		assert!(tip.is_some());
		session.cancel_requester(editor);
	}
	assert_eq!(session.pending_requests(), 21);
	assert_eq!(session.tracked_queries(), 21);

	session.tick(now + Duration::from_secs(60)).unwrap();
	assert_eq!(session.pending_requests(), 0);
	assert_eq!(session.tracked_queries(), 0);
}

#[tokio::test]
async fn disconnect_freezes_the_shell() {
	let (mut session, mut kernel) = connect();
	start(&mut session, &mut kernel).await;

	let mut handle = session.eval("x", SHELL_VIEW, Instant::now()).unwrap();
	kernel.recv_request().await;
	session.take_events();
	drop(kernel);
	tick_until(&mut session, |s| s.lifecycle() == Lifecycle::Terminated).await;

	let text = all_text(&session);
	assert!(text.contains("\n\nkernel closed connection\n\n===== Shell terminated. ====="));
	assert!(session.buffer().is_read_only());
	assert_eq!(*session.state(), InterpreterState::Dead);
	assert_eq!(handle.try_outcome(), Some(Outcome::Closed));
	assert_eq!(
		session.take_events(),
		[
			ShellEvent::StateChanged(InterpreterState::Dead),
			ShellEvent::Terminated {
				reason: "kernel closed connection".into()
			}
		]
	);

	assert!(matches!(session.execute_command("x"), Err(ShellError::Terminated)));
	assert_eq!(
		session.handle_key(Key::char('x')).unwrap(),
		KeyOutcome::Ignored
	);
	assert!(!session.tick(Instant::now()).unwrap());
	assert!(session.should_close(false));
	assert!(!session.should_close(true));
	session.disconnect("again").unwrap();
	assert_eq!(all_text(&session), text);
}
