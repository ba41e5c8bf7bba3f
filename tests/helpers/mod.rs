#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};

use app_keeper::{
    AppContext, AppMetadata, Error, HostWindow, ProcessControl, Rect, StorageMode, UserDirs,
    WindowGeometry, WindowState,
};

pub const SCREEN: Rect = Rect {
    left: 0.0,
    top: 0.0,
    width: 1920.0,
    height: 1080.0,
};

pub fn context(root: &Path, mode: StorageMode) -> AppContext {
    context_with_version(root, mode, "1.0.0")
}

pub fn context_with_version(root: &Path, mode: StorageMode, version: &str) -> AppContext {
    let metadata = AppMetadata::new("TestApp", version)
        .with_company("Acme")
        .with_executable(root.join("bin").join("TestApp"));
    AppContext::new(metadata, mode)
        .with_user_dirs(UserDirs::new(root.join("roaming"), root.join("local")))
        .with_portable_dir(root.join("bin"))
        .with_download_dir(root.join("downloads"))
}

/// Host window double with a few managed properties.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub geometry: WindowGeometry,
    pub screen: Option<Rect>,
    pub reject_size: bool,
    pub count: i64,
    pub title: String,
    pub tags: Vec<String>,
}

impl FakeWindow {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        FakeWindow {
            geometry: WindowGeometry {
                left,
                top,
                width,
                height,
                window_state: WindowState::Normal,
                is_resizable: true,
            },
            screen: Some(SCREEN),
            reject_size: false,
            count: 0,
            title: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn fixed_size(mut self) -> Self {
        self.geometry.is_resizable = false;
        self
    }
}

impl HostWindow for FakeWindow {
    fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    fn set_position(&mut self, left: f64, top: f64) {
        self.geometry.left = left;
        self.geometry.top = top;
    }

    fn set_size(&mut self, width: f64, height: f64) -> app_keeper::Result<()> {
        if self.reject_size {
            return Err(Error::InvalidGeometry("size rejected by host".into()));
        }
        self.geometry.width = width;
        self.geometry.height = height;
        Ok(())
    }

    fn set_window_state(&mut self, state: WindowState) {
        self.geometry.window_state = state;
    }

    fn virtual_screen(&self) -> Option<Rect> {
        self.screen
    }
}

/// Records spawns and exits instead of performing them.
#[derive(Debug, Default)]
pub struct FakeProcess {
    pub spawned: RefCell<Vec<(PathBuf, Vec<String>)>>,
    pub exits: RefCell<Vec<i32>>,
    pub fail_spawn: bool,
    pub args: Vec<String>,
}

impl ProcessControl for FakeProcess {
    fn spawn(&self, program: &Path, args: &[String]) -> std::io::Result<()> {
        if self.fail_spawn {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"));
        }
        self.spawned
            .borrow_mut()
            .push((program.to_path_buf(), args.to_vec()));
        Ok(())
    }

    fn exit(&self, code: i32) {
        self.exits.borrow_mut().push(code);
    }

    fn current_args(&self) -> Vec<String> {
        self.args.clone()
    }
}

/// Client that ignores proxy environment variables, for the local responder.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Serves fixed responses on a loopback port until the test process ends.
/// Returns the base URL, e.g. `http://127.0.0.1:41234`.
pub fn serve(routes: Vec<(&'static str, u16, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            respond(stream, &routes);
        }
    });
    base
}

fn respond(mut stream: TcpStream, routes: &[(&'static str, u16, Vec<u8>)]) {
    let mut request = Vec::new();
    let mut buffer = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buffer) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    }
    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

    let (status, body) = routes
        .iter()
        .find(|(route, _, _)| *route == path)
        .map(|(_, status, body)| (*status, body.clone()))
        .unwrap_or((404, b"not found".to_vec()));
    let reason = if status == 200 { "OK" } else { "Not Found" };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}
