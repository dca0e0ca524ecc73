//! The RPC code space: protocols, interfaces and methods.
//!
//! Every directed message type in a simulation is named by an [`RpcCode`].
//! An [`RpcProtocol`] hands out interface codes, and each [`RpcInterface`]
//! hands out method codes inside its own slot. Declarations are idempotent:
//! declaring a name again returns the code it already has.

use crate::{logging::declaration_event, named::display_name, DsarchError, Named};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

mod code;
pub use code::{RpcCode, BITS_PER_INTERFACE, MAX_INTERFACES, MAX_METHODS, METHOD_BITS};

/// A remote operation that hosts can call on one another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethod {
    code: RpcCode,
    name: String,
    one_way: bool,
}

impl RpcMethod {
    pub fn code(&self) -> RpcCode {
        self.code
    }

    /// One-way methods have a request channel and no response channel.
    pub fn one_way(&self) -> bool {
        self.one_way
    }

    /// The number of channels (1 or 2) an instance of this method needs.
    pub fn num_channels(&self) -> usize {
        if self.one_way {
            1
        } else {
            2
        }
    }
}

impl Named for RpcMethod {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// A named collection of methods, the "remote type" of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcInterface {
    code: RpcCode,
    name: String,
    methods: Vec<RpcMethod>,
    name_map: FxHashMap<String, usize>,
}

impl RpcInterface {
    fn new(code: RpcCode, name: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
            methods: Vec::new(),
            name_map: FxHashMap::default(),
        }
    }

    pub fn code(&self) -> RpcCode {
        self.code
    }

    pub fn methods(&self) -> &[RpcMethod] {
        &self.methods
    }

    /// Declares a method, or returns the code of the method already declared
    /// under `name`.
    pub fn declare(&mut self, name: &str, one_way: bool) -> Result<RpcCode, DsarchError> {
        if name.is_empty() {
            return Err(DsarchError::InvalidName("method"));
        }
        if let Some(&index) = self.name_map.get(name) {
            let method = &self.methods[index];
            if method.one_way != one_way {
                return Err(DsarchError::ConflictingDeclaration(format!(
                    "{}::{}",
                    self.name, name
                )));
            }
            return Ok(method.code);
        }
        if self.methods.len() == MAX_METHODS {
            return Err(DsarchError::CapacityExceeded("too many methods in interface"));
        }

        let code = self.code.for_method(self.methods.len());
        self.name_map.insert(name.to_string(), self.methods.len());
        self.methods.push(RpcMethod {
            code,
            name: name.to_string(),
            one_way,
        });
        declaration_event(&self.name, name, code);
        Ok(code)
    }

    /// The method named by `code`. The response bit is ignored.
    pub fn method(&self, code: RpcCode) -> Result<&RpcMethod, DsarchError> {
        self.methods
            .get(code.method_index()?)
            .ok_or(DsarchError::InvalidCode {
                kind: "method",
                code: code.into_inner(),
            })
    }

    /// The code of the method called `name`, or [`RpcCode::NONE`].
    pub fn code_of(&self, name: &str) -> RpcCode {
        self.name_map
            .get(name)
            .map_or(RpcCode::NONE, |&index| self.methods[index].code)
    }

    /// The number of channels an instance of this interface creates.
    pub fn num_channels(&self) -> usize {
        self.methods.iter().map(RpcMethod::num_channels).sum()
    }
}

impl Named for RpcInterface {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// The collection of RPC interfaces used in a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcProtocol {
    name: String,
    interfaces: Vec<RpcInterface>,
    name_map: FxHashMap<String, usize>,
}

impl RpcProtocol {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A protocol with no interfaces, for views that have no network to ask.
    pub fn empty() -> &'static RpcProtocol {
        static EMPTY: OnceLock<RpcProtocol> = OnceLock::new();
        EMPTY.get_or_init(RpcProtocol::new)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn interfaces(&self) -> &[RpcInterface] {
        &self.interfaces
    }

    /// Declares an interface, or returns the code of the interface already
    /// declared under `name`.
    pub fn declare(&mut self, name: &str) -> Result<RpcCode, DsarchError> {
        if let Some(&index) = self.name_map.get(name) {
            return Ok(self.interfaces[index].code);
        }
        if name.is_empty() {
            return Err(DsarchError::InvalidName("interface"));
        }
        if self.interfaces.len() == MAX_INTERFACES {
            return Err(DsarchError::CapacityExceeded("too many interfaces in protocol"));
        }

        let code = RpcCode::for_interface(self.interfaces.len());
        self.name_map.insert(name.to_string(), self.interfaces.len());
        self.interfaces.push(RpcInterface::new(code, name));
        Ok(code)
    }

    /// Declares a method in the interface named by `interface`.
    pub fn declare_method(
        &mut self,
        interface: RpcCode,
        name: &str,
        one_way: bool,
    ) -> Result<RpcCode, DsarchError> {
        let index = self.checked_interface_index(interface)?;
        self.interfaces[index].declare(name, one_way)
    }

    /// The interface named by the interface slot of `code`.
    pub fn interface(&self, code: RpcCode) -> Result<&RpcInterface, DsarchError> {
        Ok(&self.interfaces[self.checked_interface_index(code)?])
    }

    /// The method named by `code`, in either direction.
    pub fn method(&self, code: RpcCode) -> Result<&RpcMethod, DsarchError> {
        self.interface(code)?.method(code)
    }

    /// The code of the interface called `name`, or [`RpcCode::NONE`].
    pub fn code(&self, name: &str) -> RpcCode {
        self.name_map
            .get(name)
            .map_or(RpcCode::NONE, |&index| self.interfaces[index].code)
    }

    /// The code of method `method` of interface `name`, or [`RpcCode::NONE`].
    pub fn method_code(&self, name: &str, method: &str) -> RpcCode {
        self.name_map
            .get(name)
            .map_or(RpcCode::NONE, |&index| self.interfaces[index].code_of(method))
    }

    fn checked_interface_index(&self, code: RpcCode) -> Result<usize, DsarchError> {
        let index = code.interface_index()?;
        if index >= self.interfaces.len() {
            return Err(DsarchError::InvalidCode {
                kind: "interface",
                code: code.into_inner(),
            });
        }
        Ok(index)
    }
}

impl Named for RpcProtocol {
    fn name(&self) -> String {
        display_name(&self.name, "RpcProtocol", self.interfaces.len())
    }
}
