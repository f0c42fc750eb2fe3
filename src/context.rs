//! Redraw runtime: owns the view tree and the framebuffer and decides when
//! a pass runs.
//!
//! The thread that calls [`Context::start`] is the UI thread. Other threads
//! talk to it through a [`ContextHandle`]; their requests are queued and only
//! applied between passes, so a pass always sees a consistent tree.
//!
//! ```ignore
//! let mut ctx = Context::new(ContextConfig::default())?;
//! let label = ctx.tree_mut().leaf(TextView::new("--:--", TextSize::Large), Preference::wrap());
//! ctx.add_view(ctx.root(), label)?;
//! ctx.on_redraw(|redraw| panel.update(redraw.buffer, redraw.hint));
//!
//! let handle = ctx.handle();
//! std::thread::spawn(move || loop {
//!     handle.mutate(move |tree| { /* update the label */ }).ok();
//! });
//! ctx.start()?;
//! ```

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::cell::RefCell;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, error, info, trace, warn};

use crate::config::ContextConfig;
use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::refresh::{RefreshHint, RefreshScheduler};
use crate::resources::{NoResources, ResourceProvider};
use crate::ui::core::{Env, ViewId};
use crate::ui::layouts::LayoutEngine;
use crate::ui::render::draw_tree;
use crate::ui::tree::ViewTree;

/// Capacity of the cross-thread mutation queue.
pub const REQUEST_QUEUE_CAPACITY: usize = 16;

/// Distinct views remembered between passes before an invalidation
/// degrades to a full repaint.
pub const PENDING_INVALIDATION_CAPACITY: usize = 32;

type Mutation = Box<dyn FnOnce(&mut ViewTree) + Send>;
type RedrawCallback = Box<dyn FnMut(&Redraw<'_>) -> Result<(), Error>>;

/// A finished pass, handed to the redraw callback.
pub struct Redraw<'a> {
    pub buffer: &'a FrameBuffer,
    /// Pixels that differ from the previous pass, if any
    pub changed: Option<Rectangle>,
    /// Sequence number of the pass, starting at 1
    pub pass: u64,
    pub hint: RefreshHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Idle,
    Rendering,
    /// Suspended in the scheduling loop until the next trigger
    Waiting,
}

#[derive(Default)]
struct Pending {
    full: bool,
    views: heapless::Vec<ViewId, PENDING_INVALIDATION_CAPACITY>,
    stop: bool,
}

impl Pending {
    fn invalidate(&mut self, view: Option<ViewId>) {
        match view {
            None => self.full = true,
            Some(_) if self.full => {}
            Some(id) if self.views.contains(&id) => {}
            Some(id) => {
                if self.views.push(id).is_err() {
                    debug!("Too many pending invalidations, repainting everything");
                    self.full = true;
                    self.views.clear();
                }
            }
        }
    }
}

/// State shared between the UI thread and its handles.
struct Shared {
    mutations: Channel<CriticalSectionRawMutex, Mutation, REQUEST_QUEUE_CAPACITY>,
    pending: Mutex<CriticalSectionRawMutex, RefCell<Pending>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Shared {
    fn new() -> Self {
        Self {
            mutations: Channel::new(),
            pending: Mutex::new(RefCell::new(Pending::default())),
            wake: Signal::new(),
        }
    }

    fn with_pending<R>(&self, f: impl FnOnce(&mut Pending) -> R) -> R {
        self.pending.lock(|pending| f(&mut pending.borrow_mut()))
    }
}

/// Thread-safe access to a running [`Context`].
#[derive(Clone)]
pub struct ContextHandle {
    shared: Arc<Shared>,
}

impl ContextHandle {
    /// Request a repaint of `view`, or of everything with `None`.
    ///
    /// Invalidations arriving before the next pass are merged into it.
    pub fn invalidate(&self, view: Option<ViewId>) {
        self.shared.with_pending(|pending| pending.invalidate(view));
        self.shared.wake.signal(());
    }

    /// Queue a tree mutation, applied on the UI thread before the next pass.
    pub fn mutate<F>(&self, mutation: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ViewTree) + Send + 'static,
    {
        self.shared
            .mutations
            .try_send(Box::new(mutation))
            .map_err(|_| Error::QueueFull {
                capacity: REQUEST_QUEUE_CAPACITY,
            })?;
        self.shared.wake.signal(());
        Ok(())
    }

    /// Ask the scheduling loop to return. Observed between passes.
    pub fn stop(&self) -> Result<(), Error> {
        let already = self
            .shared
            .with_pending(|pending| core::mem::replace(&mut pending.stop, true));
        if already {
            return Err(Error::InvalidState("stop already requested"));
        }
        self.shared.wake.signal(());
        Ok(())
    }
}

pub struct Context {
    config: ContextConfig,
    tree: ViewTree,
    surface: FrameBuffer,
    resources: Box<dyn ResourceProvider>,
    on_redraw: Option<RedrawCallback>,
    shared: Arc<Shared>,
    refresh: RefreshScheduler,
    state: ContextState,
    passes: u64,
}

impl Context {
    pub fn new(config: ContextConfig) -> Result<Self, Error> {
        Self::with_resources(config, NoResources)
    }

    pub fn with_resources(
        config: ContextConfig,
        resources: impl ResourceProvider + 'static,
    ) -> Result<Self, Error> {
        config.validate()?;
        let canvas = config.canvas_size();
        Ok(Self {
            config,
            tree: ViewTree::new(),
            surface: FrameBuffer::new(canvas),
            resources: Box::new(resources),
            on_redraw: None,
            shared: Arc::new(Shared::new()),
            refresh: RefreshScheduler::new(config.refresh, canvas),
            state: ContextState::Idle,
            passes: 0,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn root(&self) -> ViewId {
        self.tree.root()
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    /// Direct tree access from the UI thread. Changes are picked up by the
    /// next pass.
    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    pub fn add_view(&mut self, parent: ViewId, child: ViewId) -> Result<(), Error> {
        self.tree.add_view(parent, child)
    }

    /// The framebuffer as of the last pass.
    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Completed passes since creation.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Register the callback receiving every finished pass, replacing any
    /// previous one.
    pub fn on_redraw<F>(&mut self, callback: F)
    where
        F: FnMut(&Redraw<'_>) -> Result<(), Error> + 'static,
    {
        self.on_redraw = Some(Box::new(callback));
    }

    pub fn clear_redraw(&mut self) {
        self.on_redraw = None;
    }

    pub fn invalidate(&mut self, view: Option<ViewId>) {
        self.tree.invalidate(view);
    }

    /// Lay out and repaint the whole canvas once, then return.
    pub fn redraw_once(&mut self) -> Result<(), Error> {
        self.apply_requests();
        self.pass(true)
    }

    /// Run the scheduling loop on the calling thread until a stop request
    /// or a failed pass.
    pub fn start(&mut self) -> Result<(), Error> {
        #[cfg(feature = "std")]
        {
            futures::executor::block_on(self.run())
        }
        #[cfg(not(feature = "std"))]
        {
            embassy_futures::block_on(self.run())
        }
    }

    /// The scheduling loop as a future, for callers with their own executor.
    ///
    /// The first pass repaints everything. Afterwards a pass runs only when
    /// something was invalidated, once `settle` has passed without further
    /// requests. The
    /// loop sleeps until woken by a handle or until the tick elapses; ticks
    /// are re-armed after every pass so a slow pass never queues them up.
    pub async fn run(&mut self) -> Result<(), Error> {
        info!(
            "Redraw loop started ({}x{}, tick {} ms, settle {} ms)",
            self.config.width, self.config.height, self.config.tick_ms, self.config.settle_ms
        );
        self.tree.invalidate(None);

        let result = loop {
            self.apply_requests();
            if self.take_stop() {
                break Ok(());
            }

            if self.tree.has_damage() {
                // Postpone until a whole settle window passes without requests
                while self.config.settle_ms > 0 {
                    Timer::after(self.config.settle()).await;
                    if !self.apply_requests() {
                        break;
                    }
                    trace!("Requests arrived while settling, postponing the pass");
                }
                let started = Instant::now();
                if let Err(err) = self.pass(false) {
                    error!("Redraw pass failed: {}", err);
                    break Err(err);
                }
                let elapsed = started.elapsed();
                if elapsed > self.config.tick() {
                    warn!(
                        "Pass took {} ms, longer than the {} ms tick",
                        elapsed.as_millis(),
                        self.config.tick_ms
                    );
                }
            }

            self.state = ContextState::Waiting;
            let woke = select(Timer::after(self.config.tick()), self.shared.wake.wait()).await;
            self.state = ContextState::Idle;
            if matches!(woke, Either::First(_)) && self.config.redraw_on_tick {
                self.tree.invalidate(None);
            }
        };

        self.state = ContextState::Idle;
        info!("Redraw loop stopped after {} passes", self.passes);
        result
    }

    /// Apply queued mutations and invalidations to the tree. Returns whether
    /// there were any.
    fn apply_requests(&mut self) -> bool {
        let mut applied = 0usize;
        while let Ok(mutation) = self.shared.mutations.try_receive() {
            mutation(&mut self.tree);
            applied += 1;
        }
        let (full, views) = self.shared.with_pending(|pending| {
            (
                core::mem::take(&mut pending.full),
                core::mem::take(&mut pending.views),
            )
        });
        let any = applied > 0 || full || !views.is_empty();
        if any {
            debug!(
                "Applying {} mutations and {} invalidations{}",
                applied,
                views.len(),
                if full { " (full)" } else { "" }
            );
        }
        if full {
            self.tree.invalidate(None);
        }
        for id in views {
            self.tree.invalidate(Some(id));
        }
        any
    }

    fn take_stop(&self) -> bool {
        self.shared
            .with_pending(|pending| core::mem::take(&mut pending.stop))
    }

    fn pass(&mut self, full: bool) -> Result<(), Error> {
        self.state = ContextState::Rendering;
        let result = self.render(full);
        self.state = ContextState::Idle;
        result
    }

    fn render(&mut self, full: bool) -> Result<(), Error> {
        let env = Env {
            resources: self.resources.as_ref(),
            debug_bounds: self.config.debug_bounds,
        };
        let mut damage = LayoutEngine::run(&mut self.tree, self.config.canvas_size(), &env);
        if full {
            damage.mark_full();
        }

        if let Some(area) = damage.resolve(self.surface.area()) {
            debug!("Repainting {:?}", area);
            self.surface.set_clip(area);
            self.surface.clear(Gray8::WHITE)?;
            draw_tree(&self.tree, &mut self.surface, area, &env)?;
        }

        let changed = self.surface.present();
        let hint = self.refresh.decide(changed, full);
        self.passes += 1;
        debug!("Pass {} finished: {:?}", self.passes, hint);

        if let Some(callback) = self.on_redraw.as_mut() {
            let redraw = Redraw {
                buffer: &self.surface,
                changed,
                pass: self.passes,
                hint,
            };
            callback(&redraw).inspect_err(|err| error!("Redraw callback failed: {}", err))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use super::*;
    use crate::ui::components::{Surface, TextSize, TextView};
    use crate::ui::measure::{Align, Alignment, Margin, Preference, SizePolicy};

    /// Long tick and no settle delay so tests only advance on explicit triggers.
    fn config() -> ContextConfig {
        ContextConfig::default()
            .with_size(200, 100)
            .with_tick_ms(60_000)
            .with_settle_ms(0)
    }

    fn counter(ctx: &mut Context) -> Rc<Cell<u32>> {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        ctx.on_redraw(move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        });
        calls
    }

    #[test]
    fn test_redraw_once_calls_back_once() {
        let mut ctx = Context::new(config()).unwrap();
        let calls = counter(&mut ctx);

        ctx.redraw_once().unwrap();
        assert_eq!(calls.get(), 1);
        ctx.redraw_once().unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(ctx.passes(), 2);
        assert_eq!(ctx.state(), ContextState::Idle);
    }

    #[test]
    fn test_redraw_once_without_callback() {
        let mut ctx = Context::new(config()).unwrap();
        ctx.redraw_once().unwrap();
        assert_eq!(ctx.passes(), 1);
    }

    #[test]
    fn test_callback_can_be_replaced() {
        let mut ctx = Context::new(config()).unwrap();
        let first = counter(&mut ctx);
        let second = counter(&mut ctx);
        ctx.redraw_once().unwrap();
        assert_eq!((first.get(), second.get()), (0, 1));

        ctx.clear_redraw();
        ctx.redraw_once().unwrap();
        assert_eq!((first.get(), second.get()), (0, 1));
        assert_eq!(ctx.passes(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Context::new(ContextConfig::default().with_size(0, 0)),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_loop_coalesces_invalidations() {
        let mut ctx = Context::new(config()).unwrap();
        let root = ctx.root();
        let views: Vec<ViewId> = (0..3)
            .map(|_| ctx.tree_mut().view(Preference::fixed(10, 10)))
            .collect();
        ctx.tree_mut().add_views(root, &views).unwrap();

        let handle = ctx.handle();
        let hints = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&hints);
        ctx.on_redraw(move |redraw| {
            seen.borrow_mut().push(redraw.hint);
            if redraw.pass == 1 {
                for &view in &views {
                    handle.invalidate(Some(view));
                }
            } else {
                handle.stop()?;
            }
            Ok(())
        });

        ctx.start().unwrap();
        assert_eq!(ctx.passes(), 2);
        assert_eq!(*hints.borrow(), [RefreshHint::Full, RefreshHint::Skip]);
        assert_eq!(ctx.state(), ContextState::Idle);
    }

    #[test]
    fn test_mutation_from_another_thread() {
        let mut ctx = Context::new(config()).unwrap();
        let root = ctx.root();
        let clock = ctx
            .tree_mut()
            .leaf(TextView::new("12:00", TextSize::Medium), Preference::wrap());
        ctx.add_view(root, clock).unwrap();

        let handle = ctx.handle();
        let hints = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&hints);
        ctx.on_redraw(move |redraw| {
            seen.borrow_mut().push(redraw.hint);
            if redraw.pass == 1 {
                let remote = handle.clone();
                std::thread::spawn(move || {
                    remote
                        .mutate(move |tree| {
                            if let Some(text) = tree.widget_mut::<TextView>(clock) {
                                text.set_text("12:01");
                            }
                        })
                        .unwrap();
                });
            } else {
                handle.stop()?;
            }
            Ok(())
        });

        ctx.start().unwrap();
        assert_eq!(ctx.passes(), 2);
        assert_eq!(
            ctx.tree().widget::<TextView>(clock).map(|t| String::from(t.text())),
            Some(String::from("12:01"))
        );
        let hints = hints.borrow();
        assert_eq!(hints[0], RefreshHint::Full);
        let RefreshHint::Partial(area) = hints[1] else {
            panic!("expected a partial refresh, got {:?}", hints[1]);
        };
        let frame = ctx.tree().frame(clock).unwrap();
        assert_eq!(area.intersection(&frame), area);
    }

    #[test]
    fn test_stop_twice_is_an_error() {
        let ctx = Context::new(config()).unwrap();
        let handle = ctx.handle();
        handle.stop().unwrap();
        assert!(matches!(handle.stop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_requests_during_settle_share_one_pass() {
        let mut ctx = Context::new(config().with_settle_ms(100)).unwrap();
        let root = ctx.root();
        let column = ctx.tree_mut().vgroup(Align::Start, Preference::fill());
        let rows: Vec<ViewId> = (0..3)
            .map(|_| {
                ctx.tree_mut().leaf(
                    Surface::filled(Gray8::WHITE),
                    Preference::fill().with_height(SizePolicy::Fixed(20)),
                )
            })
            .collect();
        ctx.tree_mut().add_views(column, &rows).unwrap();
        ctx.add_view(root, column).unwrap();

        let handle = ctx.handle();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&changes);
        ctx.on_redraw(move |redraw| {
            seen.borrow_mut().push(redraw.changed);
            if redraw.pass == 1 {
                let remote = handle.clone();
                let rows = rows.clone();
                std::thread::spawn(move || {
                    for row in rows {
                        remote
                            .mutate(move |tree| {
                                if let Some(surface) = tree.widget_mut::<Surface>(row) {
                                    surface.set_fill(Some(Gray8::BLACK));
                                }
                            })
                            .unwrap();
                        std::thread::sleep(std::time::Duration::from_millis(60));
                    }
                });
            } else {
                handle.stop()?;
            }
            Ok(())
        });

        ctx.start().unwrap();
        assert_eq!(ctx.passes(), 2);
        // The last row changes after the first settle window ended, so it
        // only shares the pass because the window restarted
        assert_eq!(
            changes.borrow()[1],
            Some(Rectangle::new(Point::zero(), Size::new(200, 60)))
        );
    }

    #[test]
    fn test_redraw_on_tick_repaints_every_tick() {
        let mut ctx = Context::new(config().with_tick_ms(20).with_redraw_on_tick(true)).unwrap();
        let handle = ctx.handle();
        let hints = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&hints);
        ctx.on_redraw(move |redraw| {
            seen.borrow_mut().push(redraw.hint);
            if redraw.pass == 3 {
                handle.stop()?;
            }
            Ok(())
        });

        // Nothing is invalidated after the first pass, so only ticks can
        // drive the later ones
        ctx.start().unwrap();
        assert_eq!(ctx.passes(), 3);
        assert_eq!(
            *hints.borrow(),
            [RefreshHint::Full, RefreshHint::Skip, RefreshHint::Skip]
        );
    }

    #[test]
    fn test_stopped_context_can_restart() {
        let mut ctx = Context::new(config()).unwrap();
        let calls = counter(&mut ctx);
        let handle = ctx.handle();

        // A stop pending before start ends the loop before any pass
        handle.stop().unwrap();
        ctx.start().unwrap();
        assert_eq!(calls.get(), 0);

        let stopper = ctx.handle();
        ctx.on_redraw(move |_| stopper.stop());
        ctx.start().unwrap();
        assert_eq!(ctx.passes(), 1);
        handle.stop().unwrap();
    }

    #[test]
    fn test_callback_error_is_fatal() {
        let mut ctx = Context::new(config()).unwrap();
        ctx.on_redraw(|_| Err(Error::Display(String::from("panel busy"))));

        assert!(matches!(ctx.start(), Err(Error::Display(_))));
        assert_eq!(ctx.passes(), 1);
        assert_eq!(ctx.state(), ContextState::Idle);
        assert!(matches!(ctx.redraw_once(), Err(Error::Display(_))));
    }

    #[test]
    fn test_queue_full() {
        let ctx = Context::new(config()).unwrap();
        let handle = ctx.handle();
        for _ in 0..REQUEST_QUEUE_CAPACITY {
            handle.mutate(|_| {}).unwrap();
        }
        assert!(matches!(
            handle.mutate(|_| {}),
            Err(Error::QueueFull { capacity: REQUEST_QUEUE_CAPACITY })
        ));
    }

    #[test]
    fn test_pending_overflow_degrades_to_full() {
        let mut pending = Pending::default();
        let mut tree = ViewTree::new();
        for _ in 0..=PENDING_INVALIDATION_CAPACITY {
            let id = tree.view(Preference::wrap());
            pending.invalidate(Some(id));
        }
        assert!(pending.full);
        assert!(pending.views.is_empty());

        let mut pending = Pending::default();
        let id = tree.view(Preference::wrap());
        pending.invalidate(Some(id));
        pending.invalidate(Some(id));
        assert_eq!(pending.views.len(), 1);
    }

    #[test]
    fn test_dashboard_header_and_filler() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        let root = ctx.root();
        let tree = ctx.tree_mut();

        let column = tree.vgroup(Align::Start, Preference::fill());
        let header = tree.group(
            Alignment::new(Align::Center, Align::Start),
            Preference::fill().with_height(SizePolicy::Fixed(70)),
        );
        let background = tree.leaf(Surface::filled(Gray8::new(0x80)), Preference::fill());
        let title = tree.leaf(
            TextView::new("Dashboard", TextSize::Large),
            Preference::wrap().with_margin(Margin::new(10, 0, 0, 0)),
        );
        let filler = tree.view(Preference::fill());
        tree.add_view(root, column).unwrap();
        tree.add_views(column, &[header, filler]).unwrap();
        tree.add_views(header, &[background, title]).unwrap();

        ctx.redraw_once().unwrap();

        let tree = ctx.tree();
        assert_eq!(tree.frame(header), Some(Rectangle::new(Point::zero(), Size::new(800, 70))));
        assert_eq!(tree.frame(background), tree.frame(header));
        assert_eq!(
            tree.frame(filler),
            Some(Rectangle::new(Point::new(0, 70), Size::new(800, 410)))
        );
        let title_frame = tree.frame(title).unwrap();
        assert_eq!(title_frame.top_left.y, 10);
        assert_eq!(title_frame.top_left.x, (800 - title_frame.size.width as i32) / 2);

        let fb = ctx.surface();
        for y in 0..70 {
            assert!(fb.row(y).unwrap().iter().all(|&p| p != Gray8::WHITE), "row {y}");
        }
        for y in 70..480 {
            assert!(fb.row(y).unwrap().iter().all(|&p| p == Gray8::WHITE), "row {y}");
        }
    }
}
