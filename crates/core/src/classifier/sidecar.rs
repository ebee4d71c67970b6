use crate::classifier::{ClassifierError, ClassifierOptions, EmotionClassifier, FaceEmotion};
use crate::config::ClassifierConfig;
use crate::decode::VideoFrame;
use base64::Engine;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

const LOG_TARGET: &str = "classifier::sidecar";

#[derive(Debug, Serialize)]
struct SidecarRequest<'a> {
    width: u32,
    height: u32,
    pixel_format: &'static str,
    data: String,
    detector_backend: &'a str,
    enforce_detection: bool,
    silent: bool,
}

#[derive(Debug, Deserialize)]
struct SidecarResponse {
    ok: bool,
    #[serde(default)]
    faces: Vec<FaceEmotion>,
    error: Option<String>,
}

struct SidecarProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Talks JSON lines to a long-lived classifier process (see `sidecar/emotion_classifier.py`).
///
/// One request line per frame, one response line back. The process is spawned on first use
/// and respawned if it has exited; requests are serialized through a mutex.
pub struct SidecarEmotionClassifier {
    config: ClassifierConfig,
    options: ClassifierOptions,
    process: Mutex<Option<SidecarProcess>>,
}

impl SidecarEmotionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let options = ClassifierOptions::lenient(config.detector_backend.clone());
        Self {
            config,
            options,
            process: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    fn spawn(&self) -> Result<SidecarProcess, ClassifierError> {
        let mut child = tokio::process::Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ClassifierError::Unavailable(format!("spawn {}: {e}", self.config.command))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ClassifierError::Unavailable("sidecar stdin unavailable (pipe not created)".to_owned())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ClassifierError::Unavailable("sidecar stdout unavailable (pipe not created)".to_owned())
        })?;

        tracing::info!(
            target: LOG_TARGET,
            command = %self.config.command,
            detector_backend = %self.options.detector_backend,
            "spawned emotion classifier sidecar"
        );

        Ok(SidecarProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn encode_request(&self, frame: &VideoFrame) -> Result<String, ClassifierError> {
        let request = SidecarRequest {
            width: frame.width,
            height: frame.height,
            pixel_format: "rgb24",
            data: base64::engine::general_purpose::STANDARD.encode(&frame.data),
            detector_backend: &self.options.detector_backend,
            enforce_detection: self.options.enforce_detection,
            silent: self.options.silent,
        };
        let mut line =
            serde_json::to_string(&request).map_err(|e| ClassifierError::Protocol(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }

    async fn round_trip(&self, frame: &VideoFrame) -> Result<FaceEmotion, ClassifierError> {
        let line = self.encode_request(frame)?;

        let mut guard = self.process.lock().await;
        let exited = match guard.as_mut() {
            Some(p) => !matches!(p.child.try_wait(), Ok(None)),
            None => true,
        };
        if exited {
            *guard = Some(self.spawn()?);
        }
        let Some(process) = guard.as_mut() else {
            return Err(ClassifierError::Unavailable("sidecar not running".to_owned()));
        };

        let mut response = String::new();
        let io_result = async {
            process.stdin.write_all(line.as_bytes()).await?;
            process.stdin.flush().await?;
            process.stdout.read_line(&mut response).await
        }
        .await;

        match io_result {
            Ok(0) => {
                *guard = None;
                Err(ClassifierError::Unavailable(
                    "sidecar closed its output".to_owned(),
                ))
            }
            Ok(_) => parse_response(&response),
            Err(e) => {
                *guard = None;
                Err(ClassifierError::Unavailable(e.to_string()))
            }
        }
    }
}

impl EmotionClassifier for SidecarEmotionClassifier {
    fn classify<'a>(
        &'a self,
        frame: &'a VideoFrame,
    ) -> BoxFuture<'a, Result<FaceEmotion, ClassifierError>> {
        self.round_trip(frame).boxed()
    }
}

/// Decode one response line; the first face wins when several were detected.
fn parse_response(line: &str) -> Result<FaceEmotion, ClassifierError> {
    let response: SidecarResponse = serde_json::from_str(line.trim())
        .map_err(|e| ClassifierError::Protocol(format!("{e}: {}", line.trim())))?;

    if !response.ok {
        return Err(ClassifierError::Rejected(
            response.error.unwrap_or_else(|| "unknown error".to_owned()),
        ));
    }

    response
        .faces
        .into_iter()
        .next()
        .ok_or(ClassifierError::NoFace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VideoFrame {
        VideoFrame {
            index: 0,
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 0, 255, 0],
        }
    }

    #[test]
    fn first_face_is_used() {
        let line = r#"{"ok": true, "faces": [
            {"dominant_emotion": "happy", "emotion": {"happy": 90.0, "sad": 10.0}},
            {"dominant_emotion": "sad", "emotion": {"happy": 5.0, "sad": 95.0}}
        ]}"#;
        let face = parse_response(line).expect("parses");
        assert_eq!(face.dominant_emotion, "happy");
        assert_eq!(face.emotion.get("happy"), Some(&90.0));
    }

    #[test]
    fn no_faces_is_no_face() {
        let err = parse_response(r#"{"ok": true, "faces": []}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::NoFace));
    }

    #[test]
    fn sidecar_errors_are_rejections() {
        let err = parse_response(r#"{"ok": false, "error": "detector crashed"}"#).unwrap_err();
        match err {
            ClassifierError::Rejected(msg) => assert_eq!(msg, "detector crashed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_protocol_error() {
        let err = parse_response("Traceback (most recent call last):").unwrap_err();
        assert!(matches!(err, ClassifierError::Protocol(_)));
    }

    #[test]
    fn request_carries_lenient_options() {
        let classifier = SidecarEmotionClassifier::new(ClassifierConfig::default());
        let line = classifier.encode_request(&frame()).expect("encodes");
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
        assert_eq!(value["detector_backend"], "opencv");
        assert_eq!(value["enforce_detection"], false);
        assert_eq!(value["silent"], true);
        assert_eq!(value["pixel_format"], "rgb24");
        assert_eq!(value["data"], "/wAAAP8A");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn round_trips_through_a_process() {
        let script = r#"while read -r line; do echo '{"ok": true, "faces": [{"dominant_emotion": "neutral", "emotion": {"neutral": 80.0, "happy": 20.0}}]}'; done"#;
        let classifier = SidecarEmotionClassifier::new(ClassifierConfig {
            command: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned()],
            detector_backend: "opencv".to_owned(),
        });

        let f = frame();
        for _ in 0..3 {
            let face = classifier.classify(&f).await.expect("classified");
            assert_eq!(face.dominant_emotion, "neutral");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_command_is_unavailable() {
        let classifier = SidecarEmotionClassifier::new(ClassifierConfig {
            command: "/nonexistent/emotisense-classifier".to_owned(),
            args: Vec::new(),
            detector_backend: "opencv".to_owned(),
        });
        let err = classifier.classify(&frame()).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
