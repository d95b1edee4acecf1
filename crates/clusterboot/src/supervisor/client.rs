//! Supervisor RPC client.
//!
//! [`SupervisorClient`] is the seam the stage waiter and controller talk
//! through. [`XmlRpcSupervisor`] implements it over HTTP against the
//! supervisor's `/RPC2` endpoint. The client performs no retries; transport
//! failures surface as [`SupervisorError::Connectivity`] and callers decide
//! whether to try again.

use std::cell::Cell;
use std::error::Error;
use std::io::{self, Cursor};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use xmlrpc::{Request, Transport, Value};

use clusterboot_config::SupervisorEndpoint;

use super::errors::SupervisorError;
use super::state::ProcessState;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Operations the controller needs from the supervision service.
#[cfg_attr(test, mockall::automock)]
pub trait SupervisorClient {
    /// Confirms the supervisor is answering calls.
    fn ping(&self) -> Result<(), SupervisorError>;

    /// Reports the state of one process, addressed as `group:name`.
    fn process_state(&self, name: &str) -> Result<ProcessState, SupervisorError>;

    /// Starts every process in a group. Returns once the command is accepted.
    fn start_group(&self, group: &str) -> Result<(), SupervisorError>;

    /// Starts a single process. Returns once the command is accepted.
    fn start_process(&self, name: &str) -> Result<(), SupervisorError>;

    /// Asks the supervisor to stop its children and exit.
    fn shutdown(&self) -> Result<(), SupervisorError>;
}

/// Name of instance `index` in `group`, as registered by the supervisor.
#[must_use]
pub fn instance_name(group: &str, index: u32) -> String {
    format!("{group}:{group}_{index}")
}

/// XML-RPC over HTTP client.
#[derive(Debug, Clone)]
pub struct XmlRpcSupervisor {
    endpoint: SupervisorEndpoint,
    http: Client,
}

impl XmlRpcSupervisor {
    /// Builds a client for `endpoint`. No connection is made until the first call.
    pub fn connect(
        endpoint: SupervisorEndpoint,
        request_timeout: Duration,
    ) -> Result<Self, SupervisorError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| SupervisorError::ClientSetup { source })?;
        Ok(Self { endpoint, http })
    }

    fn call(&self, method: &'static str, params: &[&str]) -> Result<Value, SupervisorError> {
        debug!(target: CLIENT_TARGET, method, ?params, "supervisor call");
        let request = params
            .iter()
            .fold(Request::new(method), |request, param| request.arg(*param));
        let failure = Cell::new(None);
        let transport = HttpTransport {
            supervisor: self,
            method,
            failure: &failure,
        };
        request.call(transport).map_err(|error| {
            failure
                .take()
                .unwrap_or_else(|| Self::rejected(method, error))
        })
    }

    /// Posts one encoded call and returns the whole response body.
    fn post(&self, method: &'static str, body: Vec<u8>) -> Result<Vec<u8>, SupervisorError> {
        let response = self
            .http
            .post(self.endpoint.to_string())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .map_err(|error| self.connectivity(error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SupervisorError::HttpStatus {
                endpoint: self.endpoint.to_string(),
                method,
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|error| self.connectivity(error))
    }

    fn connectivity(&self, error: reqwest::Error) -> SupervisorError {
        SupervisorError::Connectivity {
            endpoint: self.endpoint.to_string(),
            source: io::Error::other(error),
        }
    }

    /// Classifies an error raised after the supervisor answered.
    fn rejected(method: &'static str, error: xmlrpc::Error) -> SupervisorError {
        match error.fault() {
            Some(fault) => SupervisorError::Fault {
                method,
                code: i64::from(fault.fault_code),
                message: fault.fault_string.clone(),
            },
            None => SupervisorError::Protocol {
                method,
                source: error,
            },
        }
    }
}

/// Carries one call over the client's HTTP connection pool.
///
/// Transport failures are parked in `failure` so they keep their own
/// classification instead of surfacing as an opaque `xmlrpc` error.
struct HttpTransport<'a> {
    supervisor: &'a XmlRpcSupervisor,
    method: &'static str,
    failure: &'a Cell<Option<SupervisorError>>,
}

impl Transport for HttpTransport<'_> {
    type Stream = Cursor<Vec<u8>>;

    fn transmit(self, request: &Request<'_>) -> Result<Self::Stream, Box<dyn Error + Send + Sync>> {
        let mut body = Vec::new();
        request.write_as_xml(&mut body)?;
        match self.supervisor.post(self.method, body) {
            Ok(response) => Ok(Cursor::new(response)),
            Err(error) => {
                let message = error.to_string();
                self.failure.set(Some(error));
                Err(message.into())
            }
        }
    }
}

impl SupervisorClient for XmlRpcSupervisor {
    fn ping(&self) -> Result<(), SupervisorError> {
        self.call("supervisor.getState", &[]).map(|_| ())
    }

    fn process_state(&self, name: &str) -> Result<ProcessState, SupervisorError> {
        const METHOD: &str = "supervisor.getProcessInfo";
        let info = self.call(METHOD, &[name])?;
        if let Value::Struct(members) = &info
            && let Some(Value::String(state)) = members.get("statename")
        {
            return Ok(ProcessState::from_state_name(state));
        }
        Err(SupervisorError::MissingState {
            method: METHOD,
            process: name.to_owned(),
        })
    }

    fn start_group(&self, group: &str) -> Result<(), SupervisorError> {
        self.call("supervisor.startProcessGroup", &[group]).map(|_| ())
    }

    fn start_process(&self, name: &str) -> Result<(), SupervisorError> {
        self.call("supervisor.startProcess", &[name]).map(|_| ())
    }

    fn shutdown(&self) -> Result<(), SupervisorError> {
        self.call("supervisor.shutdown", &[]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    const RUNNING_INFO: &str = "<?xml version='1.0'?><methodResponse><params><param><value>\
        <struct><member><name>statename</name><value><string>RUNNING</string></value></member>\
        </struct></value></param></params></methodResponse>";

    const BAD_NAME_FAULT: &str = "<?xml version='1.0'?><methodResponse><fault><value><struct>\
        <member><name>faultCode</name><value><int>10</int></value></member>\
        <member><name>faultString</name><value><string>BAD_NAME: nope</string></value></member>\
        </struct></value></fault></methodResponse>";

    const NAMELESS_INFO: &str = "<?xml version='1.0'?><methodResponse><params><param><value>\
        <struct><member><name>pid</name><value><int>0</int></value></member>\
        </struct></value></param></params></methodResponse>";

    /// Serves one canned XML-RPC answer and hands back the request body.
    fn serve_once(answer: &'static str) -> (SupervisorEndpoint, mpsc::Receiver<String>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let body = read_request_body(&stream);
            sender.send(body).expect("send request body");
            let mut stream = stream;
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{answer}",
                answer.len()
            );
            stream.write_all(reply.as_bytes()).expect("write reply");
        });
        let endpoint = format!("http://127.0.0.1:{port}/RPC2")
            .parse()
            .expect("endpoint");
        (endpoint, receiver)
    }

    fn read_request_body(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0_usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().expect("content length");
            }
        }
        let mut body = vec![0_u8; content_length];
        reader.read_exact(&mut body).expect("read body");
        String::from_utf8(body).expect("utf-8 body")
    }

    fn client(endpoint: SupervisorEndpoint) -> XmlRpcSupervisor {
        XmlRpcSupervisor::connect(endpoint, Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn instance_names_follow_group_convention() {
        assert_eq!(instance_name("run_signals", 3), "run_signals:run_signals_3");
    }

    #[test]
    fn process_state_reads_statename() {
        let (endpoint, requests) = serve_once(RUNNING_INFO);
        let state = client(endpoint)
            .process_state("run_signals:run_signals_0")
            .expect("state");
        assert_eq!(state, ProcessState::Running);

        let body = requests.recv().expect("request body");
        assert!(body.contains("supervisor.getProcessInfo"));
        assert!(body.contains("run_signals:run_signals_0"));
    }

    #[test]
    fn faults_are_answers_not_connectivity_failures() {
        let (endpoint, _requests) = serve_once(BAD_NAME_FAULT);
        let error = client(endpoint)
            .start_process("nope")
            .expect_err("fault expected");
        assert!(!error.is_connectivity());
        assert!(matches!(
            error,
            SupervisorError::Fault {
                method: "supervisor.startProcess",
                code: 10,
                ..
            }
        ));
    }

    #[test]
    fn answers_without_statename_are_rejected() {
        let (endpoint, _requests) = serve_once(NAMELESS_INFO);
        let error = client(endpoint)
            .process_state("autoscaler")
            .expect_err("statename is required");
        assert!(!error.is_connectivity());
        assert!(matches!(
            error,
            SupervisorError::MissingState { ref process, .. } if process == "autoscaler"
        ));
    }

    #[test]
    fn malformed_answers_are_protocol_errors() {
        let (endpoint, _requests) = serve_once("<html>busy</html>");
        let error = client(endpoint).ping().expect_err("not XML-RPC");
        assert!(matches!(
            error,
            SupervisorError::Protocol {
                method: "supervisor.getState",
                ..
            }
        ));
    }

    #[test]
    fn refused_connections_are_connectivity_failures() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        let endpoint = format!("http://127.0.0.1:{port}/RPC2")
            .parse()
            .expect("endpoint");

        let error = client(endpoint).ping().expect_err("nothing is listening");
        assert!(error.is_connectivity(), "unexpected error: {error}");
    }
}
