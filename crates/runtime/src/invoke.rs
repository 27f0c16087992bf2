//! Invocation engine
//!
//! Native code calls VM-resident targets by describing the call and handing
//! it to [`Context::invoke`]:
//!
//! ```rust,ignore
//! let suma = ctx.symbols().find_name("SUMA").unwrap();
//! let total = ctx.invoke(Call::function(suma).arg(1500).arg(250.35))?;
//!
//! let cambia = ctx.symbols().find_name("CAMBIADATOS").unwrap();
//! ctx.invoke(Call::method(cambia, persona.clone()).arg("Ana").arg(30))?;
//! ```
//!
//! or with the push protocol, whose order (symbol, self, arguments, dispatch)
//! is enforced by the type system:
//!
//! ```rust,ignore
//! let total = ctx.push_symbol(suma).push_nil().push(1500).push(250.35).do_call()?;
//! ```
//!
//! Every invocation runs the same six phases: Begin (push a frame, clear the
//! pending return), Receiver, Arguments, Dispatch, Result (read the frame's
//! return slot), End (pop the frame). A nil receiver calls the target as a
//! function; any other receiver is sent the target's name as a message.

use crate::config::BridgeConfig;
use crate::error::RuntimeError;
use crate::errors::{ErrorHandler, LaunchOutcome};
use crate::log::{FileStorage, LogWriter, StdStorage};
use crate::params::Params;
use crate::stack::{CallStack, Frame};
use crate::symbol::{EVAL, SymbolTable, Target};
use itembridge_core::error_object::{GEN_NOMETHOD, NOMETHOD_RETRIES, SUBCODE_NOMETHOD};
use itembridge_core::{ErrorFlags, ErrorObject, Item, Kind, Object, Slot, Symbol, TypeMask};
use std::cell::RefMut;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Receiver of an invocation
#[derive(Debug, Clone, Default)]
pub enum Receiver {
    #[default]
    Nil,
    /// Object, block or any other item a message is sent to
    Object(Item),
}

impl Receiver {
    pub fn into_item(self) -> Item {
        match self {
            Receiver::Nil => Item::Nil,
            Receiver::Object(item) => item,
        }
    }
}

impl From<Item> for Receiver {
    fn from(item: Item) -> Self {
        match item.deref_value() {
            Item::Nil => Receiver::Nil,
            other => Receiver::Object(other),
        }
    }
}

/// How the caller asked for the call
///
/// Only traced: the receiver picks the dispatch path, so a `Do` with an
/// object receiver is answered as a message send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Plain call
    Do,
    /// Message send
    Send,
}

/// Call descriptor
#[derive(Debug, Clone)]
pub struct Call {
    pub target: Symbol,
    pub receiver: Receiver,
    pub args: Vec<Item>,
    pub mode: Dispatch,
}

impl Call {
    pub fn function(target: Symbol) -> Self {
        Call {
            target,
            receiver: Receiver::Nil,
            args: Vec::new(),
            mode: Dispatch::Do,
        }
    }

    pub fn method(target: Symbol, receiver: impl Into<Item>) -> Self {
        Call {
            target,
            receiver: Receiver::from(receiver.into()),
            args: Vec::new(),
            mode: Dispatch::Send,
        }
    }

    pub fn arg(mut self, item: impl Into<Item>) -> Self {
        self.args.push(item.into());
        self
    }

    pub fn args(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.args.extend(items);
        self
    }

    /// Pass `slot` by reference
    pub fn by_ref(mut self, slot: &Slot) -> Self {
        self.args.push(slot.by_ref());
        self
    }

    pub fn with_mode(mut self, mode: Dispatch) -> Self {
        self.mode = mode;
        self
    }
}

/// Per-thread invocation state
///
/// Holds the call stack, the pending return, the error handler chain and
/// the log collaborator. Built over a shared symbol table; `Context` itself
/// is `!Send`, so each thread builds its own.
pub struct Context {
    pub(crate) symbols: Arc<SymbolTable>,
    pub(crate) config: BridgeConfig,
    pub(crate) stack: CallStack,
    pub(crate) last_return: Option<Item>,
    pub(crate) handlers: Vec<ErrorHandler>,
    pub(crate) log: LogWriter<Box<dyn FileStorage>>,
}

impl Context {
    pub fn new(symbols: Arc<SymbolTable>) -> Self {
        Self::with_config(symbols, BridgeConfig::default())
    }

    pub fn with_config(symbols: Arc<SymbolTable>, config: BridgeConfig) -> Self {
        let storage: Box<dyn FileStorage> = Box::new(StdStorage::new());
        let log = LogWriter::from_config(storage, &config);
        Context {
            symbols,
            config,
            stack: CallStack::new(),
            last_return: None,
            handlers: Vec::new(),
            log,
        }
    }

    /// Replace the file storage behind the log natives
    pub fn with_storage(mut self, storage: impl FileStorage + 'static) -> Self {
        let storage: Box<dyn FileStorage> = Box::new(storage);
        self.log = LogWriter::from_config(storage, &self.config);
        self
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn log_writer(&mut self) -> &mut LogWriter<Box<dyn FileStorage>> {
        &mut self.log
    }

    /// Number of active frames
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Symbols of the active frames, outermost first
    pub fn frames(&self) -> Vec<Symbol> {
        self.stack.symbols()
    }

    /// Lookup using the configured case mode
    pub fn find(&self, name: &str) -> Option<Symbol> {
        self.symbols.find(name, self.config.symbol_case)
    }

    /// Set the return value of the running invocation
    pub fn ret(&mut self, item: impl Into<Item>) {
        let item = item.into().deref_value();
        match self.stack.ret_mut() {
            Some(mut slot) => *slot = item,
            None => warn!("return value set outside of any invocation"),
        }
    }

    /// The running invocation's return slot, for in-place updates
    pub fn ret_mut(&self) -> Option<RefMut<'_, Item>> {
        self.stack.ret_mut()
    }

    /// Result of the last completed invocation, handed out once
    pub fn take_return(&mut self) -> Option<Item> {
        self.last_return.take()
    }

    /// Start a push-protocol call
    pub fn push_symbol(&mut self, target: Symbol) -> PendingCall<'_, NeedsSelf> {
        PendingCall {
            ctx: self,
            call: Call::function(target),
            _state: PhantomData,
        }
    }

    /// Call `name` with `args`; a missing symbol is an error
    pub fn call(&mut self, name: &str, args: Vec<Item>) -> Result<Item, RuntimeError> {
        let target = self
            .find(name)
            .ok_or_else(|| RuntimeError::SymbolNotFound(name.to_string()))?;
        self.invoke(Call::function(target).args(args))
    }

    /// Call `name` if the table has it; a missing symbol skips the call
    pub fn call_if_present(
        &mut self,
        name: &str,
        args: Vec<Item>,
    ) -> Result<Option<Item>, RuntimeError> {
        match self.find(name) {
            Some(target) => self.invoke(Call::function(target).args(args)).map(Some),
            None => {
                warn!(name, "symbol not found, call skipped");
                Ok(None)
            }
        }
    }

    pub fn invoke(&mut self, call: Call) -> Result<Item, RuntimeError> {
        let Call {
            target,
            receiver,
            args,
            mode,
        } = call;

        let depth = self.stack.depth();
        if depth >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        let symbols = Arc::clone(&self.symbols);
        let name = symbols.name(target).unwrap_or("?");
        debug!(symbol = name, mode = ?mode, argc = args.len(), depth, "invoke");

        // Begin
        self.last_return = None;
        let guard = self.stack.push(Frame::new(target));
        trace!(phase = "begin", symbol = name, depth = guard.depth());

        // Receiver
        let receiver = receiver.into_item();
        if let Some(mut frame) = self.stack.top_mut() {
            frame.receiver = receiver.clone();
        }
        trace!(phase = "receiver", kind = %receiver.kind());

        // Arguments
        if let Some(mut frame) = self.stack.top_mut() {
            frame.argc = args.len();
        }
        let params = Params::new(receiver, args);
        trace!(phase = "arguments", argc = params.count());

        // Dispatch
        trace!(phase = "dispatch", mode = ?mode);
        self.dispatch(&symbols, target, &params)?;

        // Result
        let result = guard.finish();
        trace!(phase = "result", kind = %result.kind());

        // End
        self.last_return = Some(result.clone());
        trace!(phase = "end", depth = self.stack.depth());
        Ok(result)
    }

    fn dispatch(
        &mut self,
        symbols: &SymbolTable,
        target: Symbol,
        params: &Params,
    ) -> Result<(), RuntimeError> {
        let entry = symbols
            .target(target)
            .ok_or(RuntimeError::InvalidSymbol(target))?;

        if !params.self_item().is_nil() {
            return self.send_message(symbols, target, params);
        }

        match entry {
            Target::Function(f) | Target::BlockCode(f) => {
                let f = Arc::clone(f);
                f(self, params)
            }
            Target::Class(def) => {
                self.ret(Object::new(def.name(), def.field_count()));
                Ok(())
            }
            Target::Eval => {
                let block = params.param(1, TypeMask::BLOCK).ok_or_else(|| {
                    RuntimeError::TypeMismatch {
                        expected: Kind::Block,
                        found: params.item_param(1).kind(),
                    }
                })?;
                let rest = params.args().get(1..).unwrap_or_default().to_vec();
                self.run_block(symbols, &Params::new(block, rest))
            }
            Target::Message => Err(RuntimeError::NotAFunction(
                symbols.name(target).unwrap_or("?").to_string(),
            )),
        }
    }

    /// Run the code of the block in `params.self_item()`
    fn run_block(&mut self, symbols: &SymbolTable, params: &Params) -> Result<(), RuntimeError> {
        let code = match params.block() {
            Some(block) => block.code(),
            None => {
                return Err(RuntimeError::TypeMismatch {
                    expected: Kind::Block,
                    found: params.self_item().kind(),
                });
            }
        };
        match symbols.target(code) {
            Some(Target::BlockCode(f)) | Some(Target::Function(f)) => {
                let f = Arc::clone(f);
                f(self, params)
            }
            _ => Err(RuntimeError::InvalidSymbol(code)),
        }
    }

    fn send_message(
        &mut self,
        symbols: &SymbolTable,
        target: Symbol,
        params: &Params,
    ) -> Result<(), RuntimeError> {
        let message = symbols.name(target).unwrap_or("?");
        let mut err = ErrorObject::new()
            .with_subsystem("BASE")
            .with_gen_code(GEN_NOMETHOD)
            .with_sub_code(SUBCODE_NOMETHOD)
            .with_description("No exported method")
            .with_operation(message)
            .with_flags(
                ErrorFlags::CAN_RETRY | ErrorFlags::CAN_SUBSTITUTE | ErrorFlags::CAN_DEFAULT,
            )
            .with_retries(NOMETHOD_RETRIES);

        loop {
            if self.resolve_message(symbols, target, message, params)? {
                return Ok(());
            }
            debug!(message, receiver = %params.self_item().kind(), "no exported method");
            match self.launch(&mut err)? {
                LaunchOutcome::Retry => continue,
                LaunchOutcome::Substituted(item) => {
                    self.ret(item);
                    return Ok(());
                }
                LaunchOutcome::Defaulted | LaunchOutcome::Ignored => {
                    self.ret(Item::Nil);
                    return Ok(());
                }
            }
        }
    }

    /// Try to answer `message`; `false` when the receiver does not understand it
    fn resolve_message(
        &mut self,
        symbols: &SymbolTable,
        target: Symbol,
        message: &str,
        params: &Params,
    ) -> Result<bool, RuntimeError> {
        let object = match params.self_item() {
            Item::Block(_) if target == EVAL => {
                self.run_block(symbols, params)?;
                return Ok(true);
            }
            Item::Object(object) => object,
            _ => return Ok(false),
        };

        let class_name = object.borrow().class_name().to_string();
        let Some(def) = symbols.class(&class_name) else {
            return Ok(false);
        };

        if let Some(method) = def.find_method(message) {
            let method = Arc::clone(method);
            method(self, params)?;
            return Ok(true);
        }

        if let Some(index) = def.field_index(message) {
            let value = object.borrow().fields().get(index)?.clone();
            self.ret(value);
            return Ok(true);
        }

        if let Some(index) = message.strip_prefix('_').and_then(|m| def.field_index(m)) {
            let value = params.item_param(1);
            object.borrow_mut().fields_mut().set(index, value.clone())?;
            self.ret(value);
            return Ok(true);
        }

        Ok(false)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.stack.depth())
            .field("handlers", &self.handlers.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Push protocol state: the receiver has not been pushed yet
pub struct NeedsSelf;

/// Push protocol state: arguments may be pushed, then dispatched
pub struct Args;

/// Call under construction via the push protocol
pub struct PendingCall<'a, S> {
    ctx: &'a mut Context,
    call: Call,
    _state: PhantomData<S>,
}

impl<'a> PendingCall<'a, NeedsSelf> {
    /// Nil receiver: a plain function call
    pub fn push_nil(self) -> PendingCall<'a, Args> {
        PendingCall {
            ctx: self.ctx,
            call: self.call,
            _state: PhantomData,
        }
    }

    pub fn push_self(mut self, receiver: impl Into<Item>) -> PendingCall<'a, Args> {
        self.call.receiver = Receiver::from(receiver.into());
        PendingCall {
            ctx: self.ctx,
            call: self.call,
            _state: PhantomData,
        }
    }
}

impl<'a> PendingCall<'a, Args> {
    pub fn push(mut self, item: impl Into<Item>) -> Self {
        self.call.args.push(item.into());
        self
    }

    pub fn push_ref(mut self, slot: &Slot) -> Self {
        self.call.args.push(slot.by_ref());
        self
    }

    pub fn do_call(self) -> Result<Item, RuntimeError> {
        self.ctx.invoke(self.call.with_mode(Dispatch::Do))
    }

    pub fn send(self) -> Result<Item, RuntimeError> {
        self.ctx.invoke(self.call.with_mode(Dispatch::Send))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ClassDef;

    fn table() -> Arc<SymbolTable> {
        let mut builder = SymbolTable::builder()
            .function("SUMA", |ctx, p| {
                ctx.ret(p.parnd(1) + p.parnd(2));
                Ok(())
            })
            .function("DEPTH", |ctx, _| {
                let depth = ctx.depth() as i32;
                ctx.ret(depth);
                Ok(())
            });
        builder.class(ClassDef::new("Punto").data("x"));
        builder.build()
    }

    #[test]
    fn test_do_call() {
        let mut ctx = Context::new(table());
        let suma = ctx.find("suma").unwrap();
        let result = ctx.invoke(Call::function(suma).arg(1500).arg(250.35)).unwrap();
        assert_eq!(result, Item::Double(1500.0 + 250.35));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_push_protocol_matches_descriptor() {
        let mut ctx = Context::new(table());
        let suma = ctx.find("SUMA").unwrap();
        let pushed = ctx.push_symbol(suma).push_nil().push(1).push(2).do_call().unwrap();
        let sent = ctx.push_symbol(suma).push_nil().push(1).push(2).send().unwrap();
        assert_eq!(pushed, Item::Double(3.0));
        assert_eq!(sent, pushed);
    }

    #[test]
    fn test_frame_is_active_during_dispatch() {
        let mut ctx = Context::new(table());
        assert_eq!(ctx.call("DEPTH", vec![]).unwrap(), Item::Integer(1));
    }

    #[test]
    fn test_take_return_once() {
        let mut ctx = Context::new(table());
        ctx.call("SUMA", vec![Item::Integer(1), Item::Integer(1)]).unwrap();
        assert_eq!(ctx.take_return(), Some(Item::Double(2.0)));
        assert_eq!(ctx.take_return(), None);
    }

    #[test]
    fn test_missing_symbol() {
        let mut ctx = Context::new(table());
        assert_eq!(ctx.call_if_present("NOPE", vec![]).unwrap(), None);
        assert_eq!(
            ctx.call("NOPE", vec![]),
            Err(RuntimeError::SymbolNotFound("NOPE".to_string()))
        );
    }

    #[test]
    fn test_class_symbol_creates_instance_with_accessors() {
        let mut ctx = Context::new(table());
        let punto = ctx.call("PUNTO", vec![]).unwrap();
        assert_eq!(punto.type_letter(), "O");

        let setter = ctx.find("_X").unwrap();
        let getter = ctx.find("X").unwrap();
        ctx.invoke(Call::method(setter, punto.clone()).arg(7)).unwrap();
        assert_eq!(
            ctx.invoke(Call::method(getter, punto.clone())).unwrap(),
            Item::Integer(7)
        );
        // a message is not callable as a function
        assert_eq!(
            ctx.invoke(Call::function(getter)),
            Err(RuntimeError::NotAFunction("X".to_string()))
        );
    }

    #[test]
    fn test_invalid_symbol_handle() {
        let mut ctx = Context::new(table());
        let bogus = Symbol::from_index(9999);
        assert_eq!(
            ctx.invoke(Call::function(bogus)),
            Err(RuntimeError::InvalidSymbol(bogus))
        );
        assert_eq!(ctx.depth(), 0);
    }
}
