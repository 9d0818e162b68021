use mock_server::MockState;
use ozmap_core::{Config, OzmapClient};

/// Start the mock OZmap on a random port and return its base URL.
pub fn spawn(state: MockState) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, state).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// Client holding the mock's initial key.
pub fn client(state: &MockState) -> OzmapClient {
    client_with(state, |config| config)
}

pub fn client_with(state: &MockState, configure: impl FnOnce(Config) -> Config) -> OzmapClient {
    let config = configure(Config::default().with_base_url(spawn(state.clone())));
    OzmapClient::new(config, Some(mock_server::API_KEY.to_string())).unwrap()
}
