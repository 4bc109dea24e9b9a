use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use listings_core::{
    api::AppRoute,
    auth::{AuthGuard, Navigator, Session},
    cache::{CacheKey, EnvironmentSignal},
    favourites::Marked,
    pages::{InitialProps, PageContext},
    token::IncomingRequest,
    AppContext, AuthState, ListingDetail, ListingDetailPage, ListingSummary, ListingsPage,
    PageView,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{error, info};

const TICK_RATE: Duration = Duration::from_millis(250);

enum AppEvent {
    Input(Event),
    Tick,
    Navigate(String),
}

/// Navigator that hands routes back to the UI loop.
struct ChannelNavigator {
    sender: mpsc::Sender<AppEvent>,
}

impl Navigator for ChannelNavigator {
    fn push(&self, route: &str) {
        if self
            .sender
            .try_send(AppEvent::Navigate(route.to_string()))
            .is_err()
        {
            error!(route, "navigation dropped");
        }
    }
}

enum Screen {
    Listings,
    Detail(Arc<ListingDetailPage>),
    SignIn,
}

/// Terminal client for the listing pages.
pub struct ListingsApp {
    context: AppContext,
    listings: Option<Arc<ListingsPage>>,
    screen: Screen,
    cursor: usize,
    status: String,
    should_quit: bool,
    tasks: Vec<JoinHandle<()>>,
    detail_tasks: Vec<JoinHandle<()>>,
}

impl ListingsApp {
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            listings: None,
            screen: Screen::Listings,
            cursor: 0,
            status: String::new(),
            should_quit: false,
            tasks: Vec::new(),
            detail_tasks: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        self.attach_events(event_tx.clone());

        self.open_listings().await;
        let mut updates = self.context.cache().subscribe_updates();

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)
            .context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.process_app_event(event),
                        None => break,
                    }
                }
                update = updates.recv() => self.handle_cache_update(update),
            }
        }

        restore_terminal(&mut terminal)?;
        self.close_detail();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }

    /// Route auth changes back into the event loop. The guard is the only
    /// source of sign-in redirects.
    fn attach_events(&mut self, sender: mpsc::Sender<AppEvent>) {
        let navigator = Arc::new(ChannelNavigator { sender });
        let guard = AuthGuard::new(
            self.context.auth().clone(),
            navigator,
            self.context.config().sign_in_route.clone(),
        )
        .spawn();
        self.tasks.push(guard);
    }

    /// Server-style bootstrap from the cookie jar, then client mount.
    async fn open_listings(&mut self) {
        let request = self
            .context
            .client_token()
            .map(|token| IncomingRequest::with_cookie(format!("token={token}")));
        let props = ListingsPage::initial_props(self.context.api(), &PageContext::new(request)).await;
        if props.error {
            info!(reason = ?props.reason, "listings bootstrap produced no seed");
        }

        let page = Arc::new(ListingsPage::mount(&self.context, props));
        self.tasks.extend(page.watch_environment(&self.context));
        let loader = page.clone();
        self.tasks.push(tokio::spawn(async move {
            loader.load().await;
        }));
        self.listings = Some(page);
        self.screen = Screen::Listings;
    }

    fn open_detail(&mut self, id: String) {
        self.close_detail();
        let page = Arc::new(ListingDetailPage::mount(
            &self.context,
            &id,
            InitialProps::skipped(),
        ));
        self.detail_tasks.push(page.watch_environment(&self.context));
        let loader = page.clone();
        self.detail_tasks.push(tokio::spawn(async move {
            loader.load().await;
        }));
        self.status = format!("Opened {}", AppRoute::ListingDetail(id));
        self.screen = Screen::Detail(page);
    }

    /// Leaving the detail page abandons its watcher and any pending load.
    fn close_detail(&mut self) {
        for task in self.detail_tasks.drain(..) {
            task.abort();
        }
        if matches!(self.screen, Screen::Detail(_)) {
            self.screen = Screen::Listings;
        }
    }

    fn process_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(Event::Key(key)) => self.handle_key(key),
            AppEvent::Input(Event::FocusGained) => {
                self.context.cache().signal(EnvironmentSignal::Focus);
            }
            AppEvent::Input(_) | AppEvent::Tick => {}
            AppEvent::Navigate(route) => {
                info!(%route, "navigate");
                if route == self.context.config().sign_in_route {
                    self.close_detail();
                    self.screen = Screen::SignIn;
                    self.status = "Signed out".to_string();
                }
            }
        }
    }

    fn handle_cache_update(&mut self, update: Result<CacheKey, broadcast::error::RecvError>) {
        if let Err(broadcast::error::RecvError::Lagged(skipped)) = update {
            info!(skipped, "cache updates lagged");
        }
        let pruned = self.context.cache().prune();
        if pruned > 0 {
            info!(pruned, "dropped unused cache entries");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('q')
            || (key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('r') => {
                self.status = "Refreshing".to_string();
                self.context.cache().signal(EnvironmentSignal::Reconnect);
            }
            // The running guard sees the flag drop and issues the redirect.
            KeyCode::Char('s') => self.context.auth().logout(),
            KeyCode::Char('l') if matches!(self.screen, Screen::SignIn) => {
                let token = self.context.client_token();
                self.context.auth().sync_with_token(token.as_deref());
                if self.context.auth().state().is_authenticated() {
                    self.status = "Signed in".to_string();
                    self.screen = Screen::Listings;
                } else {
                    self.status = "No token configured".to_string();
                }
            }
            KeyCode::Esc => self.close_detail(),
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = self.cursor.saturating_add(1),
            KeyCode::Enter => {
                if matches!(self.screen, Screen::Listings) {
                    if let Some(id) = self.selected_id() {
                        self.open_detail(id);
                    }
                }
            }
            _ => {}
        }
    }

    fn selected_id(&self) -> Option<String> {
        let page = self.listings.as_ref()?;
        match page.view(self.auth_state()) {
            PageView::Ready(items) => items.get(self.cursor).map(|marked| marked.item.id.clone()),
            _ => None,
        }
    }

    fn auth_state(&self) -> AuthState {
        self.context.auth().state()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(frame.size());

        match &self.screen {
            Screen::SignIn => {
                render_placeholder(frame, chunks[0], "Not authenticated", "press l to sign in")
            }
            Screen::Listings => {
                let view = self
                    .listings
                    .as_ref()
                    .map(|page| page.view(self.auth_state()))
                    .unwrap_or(PageView::Loading);
                if let PageView::Ready(items) = &view {
                    self.cursor = self.cursor.min(items.len().saturating_sub(1));
                }
                render_listings(frame, chunks[0], view, self.cursor);
            }
            Screen::Detail(page) => render_detail(frame, chunks[0], page.view(self.auth_state())),
        }
        self.render_status(frame, chunks[1]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let help = "↑/↓ select  ⏎ open  esc back  r refresh  s sign out  q quit";
        let line = if self.status.is_empty() {
            Line::from(help)
        } else {
            Line::from(vec![
                Span::styled(self.status.clone(), Style::default().fg(Color::Cyan)),
                Span::raw(" • "),
                Span::raw(help),
            ])
        };
        let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_failure(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL).title("Error"));
    frame.render_widget(paragraph, area);
}

fn render_listings(
    frame: &mut Frame,
    area: Rect,
    view: PageView<Vec<Marked<ListingSummary>>>,
    cursor: usize,
) {
    let items = match view {
        PageView::Unauthenticated => {
            return render_placeholder(frame, area, "Listings", "Not authenticated")
        }
        PageView::Failed(message) => return render_failure(frame, area, message),
        PageView::Loading => return render_placeholder(frame, area, "Listings", "Loading…"),
        PageView::Ready(items) => items,
    };

    let rows: Vec<ListItem> = items
        .iter()
        .map(|marked| {
            let star = if marked.favourite {
                Span::styled("★ ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("  ")
            };
            let title = if marked.item.title.is_empty() {
                marked.item.id.clone()
            } else {
                marked.item.title.clone()
            };
            let mut spans = vec![
                star,
                Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
            ];
            if let Some(price) = marked.item.price {
                spans.push(Span::styled(
                    format!("  ₹ {price}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(cursor));
    }
    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title("Listings"))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    view: PageView<Arc<listings_core::Envelope<ListingDetail>>>,
) {
    let envelope = match view {
        PageView::Unauthenticated => {
            return render_placeholder(frame, area, "Listing", "Not authenticated")
        }
        PageView::Failed(message) => return render_failure(frame, area, message),
        PageView::Loading => return render_placeholder(frame, area, "Listing", "Loading…"),
        PageView::Ready(envelope) => envelope,
    };
    let listing = &envelope.data;

    let mut lines = vec![Line::from(Span::styled(
        listing.title.to_uppercase(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if let Some(price) = listing.price {
        lines.push(Line::from(format!("₹ {price}")));
    }
    if let Some(address) = &listing.address {
        lines.push(Line::from(address.street.clone()));
        lines.push(Line::from(address.locality()));
    }
    lines.push(Line::from(format!(
        "{} rooms  {} baths  {} ft²",
        listing.no_of_rooms.unwrap_or_default(),
        listing.no_of_bathrooms.unwrap_or_default(),
        listing.square_feet.unwrap_or_default()
    )));
    if let Some(photo) = listing.cover_photo() {
        lines.push(Line::from(Span::styled(
            photo.url.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "DESCRIPTION",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(
        listing.long_description.clone().unwrap_or_default(),
    ));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Listing"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
