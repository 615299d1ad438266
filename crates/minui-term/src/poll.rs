// SPDX-License-Identifier: MIT
//
// Readiness multiplexing for callers that drive more than a terminal.
//
// Safety: epoll, eventfd and signalfd have no safe stdlib wrappers; each
// unsafe block wraps a single syscall.
#![allow(unsafe_code)]
//
// Three layers. [`PollSet`] maps descriptors to handlers over one epoll
// instance. [`Terminator`] is a cloneable stop token: any thread or
// handler can request termination with an exit status, and the request
// wakes a blocked wait through an eventfd. [`MainLoop`] ties them
// together and optionally converts signals to callbacks, so a process
// can serve sockets, timers and a [`Screen`](crate::screen::Screen) from
// one thread without asynchronous signal handlers.
//
// Handlers are `FnMut(u32)` taking the readiness bits. A handler cannot
// re-borrow the set that dispatched it; shared state goes through the
// `Terminator` (or whatever the closure captures) instead.

#![cfg(unix)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Callback invoked with the readiness bits of its descriptor.
pub type Handler = Box<dyn FnMut(u32)>;

/// Per-signal callback, invoked with the signal number.
pub type SignalHandler = Box<dyn FnMut(libc::c_int)>;

/// Handlers dispatched per ready descriptor in one wait.
const MAX_BATCH: usize = 8;

fn os_error(operation: &str) -> io::Error {
    let err = io::Error::last_os_error();
    io::Error::new(err.kind(), format!("{operation}: {err}"))
}

// ─── PollSet ────────────────────────────────────────────────────────────────

/// A set of descriptors watched through one epoll instance, each with a
/// handler for its readiness.
pub struct PollSet {
    epoll_fd: libc::c_int,
    handlers: HashMap<RawFd, Handler>,
}

impl PollSet {
    /// # Errors
    ///
    /// Fails when the epoll instance cannot be created.
    pub fn new() -> io::Result<Self> {
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            return Err(os_error("epoll_create1"));
        }
        Ok(Self {
            epoll_fd,
            handlers: HashMap::new(),
        })
    }

    /// Watch `fd` for `events` (`libc::EPOLLIN` and friends), dispatching
    /// to `handler` when ready.
    ///
    /// # Errors
    ///
    /// Fails on a negative or already-watched descriptor, or when the
    /// kernel rejects the registration.
    pub fn add(&mut self, fd: RawFd, events: u32, handler: Handler) -> io::Result<()> {
        if fd < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "add: invalid descriptor",
            ));
        }
        if self.handlers.contains_key(&fd) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "add: descriptor already watched",
            ));
        }
        self.handlers.insert(fd, handler);
        let mut ev = libc::epoll_event {
            events,
            u64: fd_slot(fd),
        };
        if unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut ev) } < 0 {
            let err = os_error("epoll_ctl(EPOLL_CTL_ADD)");
            self.handlers.remove(&fd);
            return Err(err);
        }
        Ok(())
    }

    /// Stop watching `fd`.
    ///
    /// # Errors
    ///
    /// Fails when `fd` is not watched or deregistration fails. The
    /// handler is dropped either way.
    pub fn remove(&mut self, fd: RawFd) -> io::Result<()> {
        if self.handlers.remove(&fd).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "remove: descriptor not watched",
            ));
        }
        if unsafe {
            libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut())
        } < 0
        {
            return Err(os_error("epoll_ctl(EPOLL_CTL_DEL)"));
        }
        Ok(())
    }

    /// Number of watched descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Wait up to `timeout_ms` (`-1` forever, `0` poll) and dispatch the
    /// handlers of every ready descriptor. Returns how many dispatched.
    ///
    /// A descriptor removed by an earlier handler in the same batch is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails when the wait fails for any reason other than interruption.
    pub fn wait_and_dispatch(&mut self, timeout_ms: i32) -> io::Result<usize> {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; MAX_BATCH];
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let n = unsafe {
            libc::epoll_wait(
                self.epoll_fd,
                events.as_mut_ptr(),
                MAX_BATCH as i32,
                timeout_ms,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EINTR) => Ok(0),
                _ => Err(os_error("epoll_wait")),
            };
        }

        let mut dispatched = 0;
        #[allow(clippy::cast_sign_loss)]
        for ev in &events[..n as usize] {
            let fd = slot_fd(ev.u64);
            if let Some(handler) = self.handlers.get_mut(&fd) {
                handler(ev.events);
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }
}

impl Drop for PollSet {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::close(self.epoll_fd);
        }
    }
}

#[allow(clippy::cast_sign_loss)]
const fn fd_slot(fd: RawFd) -> u64 {
    fd as u64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn slot_fd(slot: u64) -> RawFd {
    slot as RawFd
}

// ─── Terminator ─────────────────────────────────────────────────────────────

/// Shared stop token for a [`MainLoop`].
///
/// The first termination request wins: it latches the exit status and
/// wakes the loop through an eventfd; later requests are no-ops. Safe to
/// call from any thread.
pub struct Terminator {
    exited: AtomicBool,
    status: AtomicI32,
    wake_fd: libc::c_int,
}

impl Terminator {
    fn new() -> io::Result<Arc<Self>> {
        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if wake_fd < 0 {
            return Err(os_error("eventfd"));
        }
        Ok(Arc::new(Self {
            exited: AtomicBool::new(false),
            status: AtomicI32::new(0),
            wake_fd,
        }))
    }

    /// Request loop termination with `status`. Only the first request
    /// sets the status.
    pub fn request_termination(&self, status: i32) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        self.status.store(status, Ordering::SeqCst);
        let one: u64 = 1;
        // The counter saturating (EAGAIN) still leaves the fd readable.
        unsafe {
            let _ = libc::write(
                self.wake_fd,
                std::ptr::from_ref(&one).cast::<libc::c_void>(),
                std::mem::size_of::<u64>(),
            );
        }
    }

    /// Whether termination has been requested.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// The latched exit status; `0` until a request lands.
    #[must_use]
    pub fn status(&self) -> i32 {
        self.status.load(Ordering::SeqCst)
    }

    const fn wake_fd(&self) -> libc::c_int {
        self.wake_fd
    }

    fn drain_wake(&self) {
        let mut counter: u64 = 0;
        unsafe {
            let _ = libc::read(
                self.wake_fd,
                std::ptr::from_mut(&mut counter).cast::<libc::c_void>(),
                std::mem::size_of::<u64>(),
            );
        }
    }
}

impl Drop for Terminator {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::close(self.wake_fd);
        }
    }
}

// ─── MainLoop ───────────────────────────────────────────────────────────────

/// A poll set with a stop token and optional signal conversion.
///
/// Construction registers the terminator's wake descriptor, so
/// [`run_forever`](Self::run_forever) returns promptly after any
/// termination request.
pub struct MainLoop {
    poll: PollSet,
    terminator: Arc<Terminator>,
    signal_fd: Option<libc::c_int>,
    original_sigmask: Option<libc::sigset_t>,
}

impl MainLoop {
    /// # Errors
    ///
    /// Fails when the poll set or the wake descriptor cannot be created.
    pub fn new() -> io::Result<Self> {
        let terminator = Terminator::new()?;
        let mut poll = PollSet::new()?;
        let wake = Arc::clone(&terminator);
        poll.add(
            terminator.wake_fd(),
            libc::EPOLLIN as u32,
            Box::new(move |_| wake.drain_wake()),
        )?;
        Ok(Self {
            poll,
            terminator,
            signal_fd: None,
            original_sigmask: None,
        })
    }

    /// The loop's stop token, cloneable into handlers and other threads.
    #[must_use]
    pub fn terminator(&self) -> Arc<Terminator> {
        Arc::clone(&self.terminator)
    }

    /// Watch `fd`, dispatching to `handler` when ready.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PollSet::add`].
    pub fn add(&mut self, fd: RawFd, events: u32, handler: Handler) -> io::Result<()> {
        self.poll.add(fd, events, handler)
    }

    /// Stop watching `fd`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PollSet::remove`].
    pub fn remove(&mut self, fd: RawFd) -> io::Result<()> {
        self.poll.remove(fd)
    }

    /// Block `signals` process-wide and deliver them through the loop:
    /// a signal with an entry in `handlers` invokes it, any other blocked
    /// signal requests termination with the signal number as status.
    ///
    /// # Errors
    ///
    /// Fails when called twice or when signal descriptor setup fails.
    pub fn set_signals(
        &mut self,
        signals: &[libc::c_int],
        handlers: HashMap<libc::c_int, SignalHandler>,
    ) -> io::Result<()> {
        if self.signal_fd.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "set_signals: signals already converted",
            ));
        }
        let (fd, previous) = signal_descriptor(signals)?;
        let terminator = Arc::clone(&self.terminator);
        let handlers = Rc::new(RefCell::new(handlers));
        let result = self.poll.add(
            fd,
            libc::EPOLLIN as u32,
            Box::new(move |_| {
                while let Some(signo) = read_signal(fd) {
                    match handlers.borrow_mut().get_mut(&signo) {
                        Some(handler) => handler(signo),
                        None => terminator.request_termination(signo),
                    }
                }
            }),
        );
        if let Err(err) = result {
            unsafe {
                libc::close(fd);
                libc::sigprocmask(libc::SIG_SETMASK, &previous, std::ptr::null_mut());
            }
            return Err(err);
        }
        self.signal_fd = Some(fd);
        self.original_sigmask = Some(previous);
        Ok(())
    }

    /// One wait-and-dispatch cycle; see [`PollSet::wait_and_dispatch`].
    ///
    /// # Errors
    ///
    /// Fails when the wait fails for any reason other than interruption.
    pub fn run_once(&mut self, timeout_ms: i32) -> io::Result<usize> {
        self.poll.wait_and_dispatch(timeout_ms)
    }

    /// Dispatch until termination is requested; returns the exit status.
    ///
    /// # Errors
    ///
    /// Fails when a wait fails for any reason other than interruption.
    pub fn run_forever(&mut self) -> io::Result<i32> {
        while !self.terminator.is_terminated() {
            self.poll.wait_and_dispatch(-1)?;
        }
        Ok(self.terminator.status())
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        if let Some(fd) = self.signal_fd {
            unsafe {
                let _ = libc::close(fd);
            }
        }
        // Undo the conversion: delivery goes back to default disposition.
        if let Some(previous) = self.original_sigmask {
            unsafe {
                let _ = libc::sigprocmask(libc::SIG_SETMASK, &previous, std::ptr::null_mut());
            }
        }
    }
}

/// Block `signals` process-wide and return a descriptor their delivery
/// becomes readable on, plus the previous signal mask for restoration.
fn signal_descriptor(signals: &[libc::c_int]) -> io::Result<(libc::c_int, libc::sigset_t)> {
    let mut mask: libc::sigset_t = unsafe { std::mem::zeroed() };
    let mut previous: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut mask);
        for &sig in signals {
            libc::sigaddset(&mut mask, sig);
        }
        if libc::sigprocmask(libc::SIG_BLOCK, &mask, &mut previous) < 0 {
            return Err(os_error("sigprocmask"));
        }
        let fd = libc::signalfd(-1, &mask, libc::SFD_NONBLOCK | libc::SFD_CLOEXEC);
        if fd < 0 {
            let err = os_error("signalfd");
            libc::sigprocmask(libc::SIG_SETMASK, &previous, std::ptr::null_mut());
            return Err(err);
        }
        Ok((fd, previous))
    }
}

/// Read one signal notification, or `None` when the descriptor is drained.
fn read_signal(fd: libc::c_int) -> Option<libc::c_int> {
    let mut info: libc::signalfd_siginfo = unsafe { std::mem::zeroed() };
    let n = unsafe {
        libc::read(
            fd,
            std::ptr::from_mut(&mut info).cast::<libc::c_void>(),
            std::mem::size_of::<libc::signalfd_siginfo>(),
        )
    };
    #[allow(clippy::cast_sign_loss)]
    if n as usize == std::mem::size_of::<libc::signalfd_siginfo>() {
        #[allow(clippy::cast_possible_wrap)]
        Some(info.ssi_signo as libc::c_int)
    } else {
        None
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell as StdCell;

    use pretty_assertions::assert_eq;

    use super::*;

    struct Pipe {
        read_fd: RawFd,
        write_fd: RawFd,
    }

    impl Pipe {
        fn new() -> Self {
            let mut fds = [0 as libc::c_int; 2];
            assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
            Self {
                read_fd: fds[0],
                write_fd: fds[1],
            }
        }

        fn write_byte(&self) {
            let byte = [0x2au8];
            let n = unsafe {
                libc::write(self.write_fd, byte.as_ptr().cast::<libc::c_void>(), 1)
            };
            assert_eq!(n, 1);
        }

        fn drain(&self) {
            let mut buf = [0u8; 16];
            unsafe {
                let _ = libc::read(self.read_fd, buf.as_mut_ptr().cast::<libc::c_void>(), 16);
            }
        }
    }

    impl Drop for Pipe {
        fn drop(&mut self) {
            unsafe {
                let _ = libc::close(self.read_fd);
                let _ = libc::close(self.write_fd);
            }
        }
    }

    #[test]
    fn rejects_invalid_and_duplicate_descriptors() {
        let pipe = Pipe::new();
        let mut poll = PollSet::new().unwrap();
        assert_eq!(
            poll.add(-1, libc::EPOLLIN as u32, Box::new(|_| {}))
                .unwrap_err()
                .kind(),
            io::ErrorKind::InvalidInput
        );
        poll.add(pipe.read_fd, libc::EPOLLIN as u32, Box::new(|_| {}))
            .unwrap();
        assert_eq!(
            poll.add(pipe.read_fd, libc::EPOLLIN as u32, Box::new(|_| {}))
                .unwrap_err()
                .kind(),
            io::ErrorKind::AlreadyExists
        );
        assert_eq!(poll.len(), 1);
    }

    #[test]
    fn remove_requires_a_watched_descriptor() {
        let pipe = Pipe::new();
        let mut poll = PollSet::new().unwrap();
        assert_eq!(
            poll.remove(pipe.read_fd).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        poll.add(pipe.read_fd, libc::EPOLLIN as u32, Box::new(|_| {}))
            .unwrap();
        poll.remove(pipe.read_fd).unwrap();
        assert!(poll.is_empty());
    }

    #[test]
    fn dispatches_ready_descriptor() {
        let pipe = Pipe::new();
        let hits = Rc::new(StdCell::new(0));
        let mut poll = PollSet::new().unwrap();
        let counted = Rc::clone(&hits);
        poll.add(
            pipe.read_fd,
            libc::EPOLLIN as u32,
            Box::new(move |events| {
                assert_ne!(events & libc::EPOLLIN as u32, 0);
                counted.set(counted.get() + 1);
            }),
        )
        .unwrap();

        assert_eq!(poll.wait_and_dispatch(0).unwrap(), 0);
        pipe.write_byte();
        assert_eq!(poll.wait_and_dispatch(-1).unwrap(), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn timeout_elapses_with_nothing_ready() {
        let mut poll = PollSet::new().unwrap();
        assert_eq!(poll.wait_and_dispatch(10).unwrap(), 0);
    }

    #[test]
    fn first_termination_request_wins() {
        let terminator = Terminator::new().unwrap();
        assert!(!terminator.is_terminated());
        terminator.request_termination(2);
        terminator.request_termination(7);
        assert!(terminator.is_terminated());
        assert_eq!(terminator.status(), 2);
    }

    #[test]
    fn run_forever_returns_the_requested_status() {
        let pipe = Pipe::new();
        let mut main_loop = MainLoop::new().unwrap();
        let terminator = main_loop.terminator();
        let read_fd = pipe.read_fd;
        main_loop
            .add(
                read_fd,
                libc::EPOLLIN as u32,
                Box::new(move |_| {
                    let mut buf = [0u8; 1];
                    unsafe {
                        let _ = libc::read(read_fd, buf.as_mut_ptr().cast::<libc::c_void>(), 1);
                    }
                    terminator.request_termination(42);
                }),
            )
            .unwrap();

        pipe.write_byte();
        assert_eq!(main_loop.run_forever().unwrap(), 42);
    }

    #[test]
    fn termination_from_another_thread_wakes_the_loop() {
        let mut main_loop = MainLoop::new().unwrap();
        let terminator = main_loop.terminator();
        let requester = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            terminator.request_termination(3);
        });
        assert_eq!(main_loop.run_forever().unwrap(), 3);
        requester.join().unwrap();
    }

    fn blocked(sig: libc::c_int) -> bool {
        let mut current: libc::sigset_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::sigprocmask(libc::SIG_SETMASK, std::ptr::null(), &mut current);
            libc::sigismember(&current, sig) == 1
        }
    }

    #[test]
    fn dropping_the_loop_unblocks_converted_signals() {
        assert!(!blocked(libc::SIGUSR2));
        let mut main_loop = MainLoop::new().unwrap();
        main_loop
            .set_signals(&[libc::SIGUSR2], HashMap::new())
            .unwrap();
        assert!(blocked(libc::SIGUSR2));
        drop(main_loop);
        assert!(!blocked(libc::SIGUSR2));
    }

    #[test]
    fn handler_keeps_firing_across_cycles() {
        let pipe = Pipe::new();
        let hits = Rc::new(StdCell::new(0));
        let mut poll = PollSet::new().unwrap();
        let counted = Rc::clone(&hits);
        let read_fd = pipe.read_fd;
        poll.add(
            read_fd,
            libc::EPOLLIN as u32,
            Box::new(move |_| {
                let mut buf = [0u8; 1];
                unsafe {
                    let _ = libc::read(read_fd, buf.as_mut_ptr().cast::<libc::c_void>(), 1);
                }
                counted.set(counted.get() + 1);
            }),
        )
        .unwrap();

        pipe.write_byte();
        poll.wait_and_dispatch(-1).unwrap();
        pipe.write_byte();
        poll.wait_and_dispatch(-1).unwrap();
        assert_eq!(hits.get(), 2);
        pipe.drain();
    }
}
