use super::SimConfig;
use dsarch_core::{
    message_size, Ack, CallHandle, DsarchError, HostId, Network, RemoteInterface, RpcProxy,
};
use tracing::info;

/// The remote interface of an [`EchoServer`].
#[derive(Debug)]
pub struct Echo;

impl RemoteInterface for Echo {
    const NAME: &'static str = "Echo";

    fn declare_calls(proxy: &mut RpcProxy, network: &mut Network) -> Result<(), DsarchError> {
        proxy.declare_call(network, "echo", false)?;
        proxy.declare_call(network, "send_int", false)?;
        proxy.declare_call(network, "get_int", false)?;
        proxy.declare_call(network, "init", false)?;
        proxy.declare_call(network, "say_bye", true)?;
        proxy.declare_call(network, "finish", true)?;
        proxy.declare_call(network, "add", false)?;
        Ok(())
    }
}

/// A server that echoes strings and stores one integer.
#[derive(Debug)]
pub struct EchoServer {
    host: HostId,
    value: i32,
}

impl EchoServer {
    pub fn new(network: &mut Network, name: &str) -> Self {
        Self {
            host: network.add_host(name),
            value: 0,
        }
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    fn echo(&self, message: &str) -> String {
        format!("Echoing {message}")
    }

    /// Stores `value`, refusing to acknowledge negative ones.
    fn send_int(&mut self, value: i32) -> Ack<i32> {
        self.value = value;
        if value < 0 {
            Ack::Suppressed
        } else {
            Ack::Acknowledged(value + 1)
        }
    }

    fn init(&self) -> Ack<()> {
        Ack::Suppressed
    }

    fn say_bye(&mut self) {
        self.value = -1;
    }

    fn add(&self, x: i32, y: i32) -> i32 {
        x + y
    }
}

#[derive(Debug, Clone, Copy)]
struct EchoCalls {
    echo: CallHandle,
    send_int: CallHandle,
    get_int: CallHandle,
    init: CallHandle,
    say_bye: CallHandle,
    finish: CallHandle,
    add: CallHandle,
}

impl EchoCalls {
    fn resolve(proxy: &RpcProxy) -> Result<Self, DsarchError> {
        let handle = |name| {
            proxy
                .handle(name)
                .ok_or(DsarchError::NotReady("echo call was not declared"))
        };
        Ok(Self {
            echo: handle("echo")?,
            send_int: handle("send_int")?,
            get_int: handle("get_int")?,
            init: handle("init")?,
            say_bye: handle("say_bye")?,
            finish: handle("finish")?,
            add: handle("add")?,
        })
    }
}

/// A client calling an [`EchoServer`] through a proxy.
#[derive(Debug)]
pub struct EchoClient {
    host: HostId,
    proxy: RpcProxy,
    calls: EchoCalls,
}

impl EchoClient {
    pub fn new(network: &mut Network, name: &str) -> Result<Self, DsarchError> {
        let host = network.add_host(name);
        let proxy = RpcProxy::of::<Echo>(network, host)?;
        let calls = EchoCalls::resolve(&proxy)?;
        Ok(Self { host, proxy, calls })
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn proxy(&self) -> &RpcProxy {
        &self.proxy
    }

    /// Binds the client to its server.
    pub fn connect(&mut self, network: &mut Network, server: &EchoServer) -> Result<(), DsarchError> {
        self.proxy.connect(network, server.host)
    }

    pub fn echo(
        &self,
        network: &mut Network,
        server: &EchoServer,
        message: &str,
    ) -> Result<String, DsarchError> {
        let answer = self.proxy.invoke(network, self.calls.echo, message_size!(message), |_| {
            Ack::Acknowledged(server.echo(message))
        })?;
        Ok(answer.into_option().unwrap_or_default())
    }

    /// Stores a value on the server. Returns the acknowledgement, which is
    /// suppressed for negative values.
    pub fn send_int(
        &self,
        network: &mut Network,
        server: &mut EchoServer,
        value: i32,
    ) -> Result<Ack<i32>, DsarchError> {
        self.proxy
            .invoke(network, self.calls.send_int, message_size!(value), |_| {
                server.send_int(value)
            })
    }

    pub fn get_int(&self, network: &mut Network, server: &EchoServer) -> Result<i32, DsarchError> {
        let answer = self
            .proxy
            .invoke(network, self.calls.get_int, 0, |_| Ack::Acknowledged(server.value))?;
        Ok(answer.into_option().unwrap_or_default())
    }

    pub fn init(&self, network: &mut Network, server: &EchoServer) -> Result<bool, DsarchError> {
        let answer = self
            .proxy
            .invoke(network, self.calls.init, 0, |_| server.init())?;
        Ok(answer.is_ack())
    }

    pub fn say_bye(
        &self,
        network: &mut Network,
        server: &mut EchoServer,
        message: &str,
    ) -> Result<(), DsarchError> {
        self.proxy
            .send(network, self.calls.say_bye, message_size!(message))?;
        server.say_bye();
        Ok(())
    }

    pub fn finish(&self, network: &mut Network) -> Result<(), DsarchError> {
        self.proxy.send(network, self.calls.finish, 0)
    }

    pub fn add(
        &self,
        network: &mut Network,
        server: &EchoServer,
        x: i32,
        y: i32,
    ) -> Result<i32, DsarchError> {
        let answer = self
            .proxy
            .invoke(network, self.calls.add, message_size!(x, y), |_| {
                Ack::Acknowledged(server.add(x, y))
            })?;
        Ok(answer.into_option().unwrap_or_default())
    }

    /// Runs the opening exchange of a session: `init`, then `send_int(10)`,
    /// then `echo(message)`.
    pub fn send_echo(
        &self,
        network: &mut Network,
        server: &mut EchoServer,
        message: &str,
    ) -> Result<String, DsarchError> {
        self.init(network, server)?;
        self.send_int(network, server, 10)?;
        self.echo(network, server, message)
    }
}

/// One server and `config.peers` clients. Each client runs `config.rounds`
/// sessions, then says goodbye.
pub fn echo(config: &SimConfig) -> Result<Network, DsarchError> {
    let mut network = Network::with_name("echo");
    let mut server = EchoServer::new(&mut network, "server");
    let mut clients = Vec::with_capacity(config.peers);
    for i in 0..config.peers {
        let mut client = EchoClient::new(&mut network, &format!("client{i}"))?;
        client.connect(&mut network, &server)?;
        clients.push(client);
    }

    for round in 0..config.rounds {
        for client in clients.iter() {
            client.send_echo(&mut network, &mut server, &format!("round {round}"))?;
            let sum = client.add(&mut network, &server, round as i32, 1)?;
            debug_assert_eq!(sum, round as i32 + 1);
        }
    }
    for client in clients.iter() {
        client.say_bye(&mut network, &mut server, "bye")?;
        client.finish(&mut network)?;
    }

    info!(
        clients = clients.len(),
        rounds = config.rounds,
        channels = network.channel_count(),
        "echo simulation finished"
    );
    Ok(network)
}
