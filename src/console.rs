use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};

use crate::board::Square;
use crate::config::SessionConfig;
use crate::game::{GameMode, GameSession};

const HELP: &str = "\
commands:
  mode 1p|2p          start a game against the computer or another player
  new                 abandon the game and return to mode selection
  select <sq>         select a piece, e.g. `select e2`
  click <sq>          select, or move the selected piece to <sq>
  move <from> <to>    play a move, e.g. `move e2 e4`
  board | status | moves | history | help | quit
";

/// Line-oriented front end driving a [`GameSession`] from stdin.
pub struct ConsoleHandler {
    session: GameSession,
    ai_moves: Rc<RefCell<Vec<String>>>,
}

impl ConsoleHandler {
    pub fn new(config: SessionConfig) -> Self {
        let mut session = GameSession::new(config);
        let ai_moves = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&ai_moves);
        session.on_ai_move_ready(move |mv, state| {
            let mut line = format!("{} plays {}", mv.color, mv);
            if state.is_check() {
                line.push_str(" (check)");
            }
            sink.borrow_mut().push(line);
        });

        Self { session, ai_moves }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut reader = stdin.lock();
        let mut line = String::new();

        writeln!(stdout, "{}", self.session.status_text())?;
        while reader.read_line(&mut line)? > 0 {
            let command = line.trim();
            if command == "quit" {
                break;
            }

            match self.handle_command(command) {
                Ok(response) => write!(stdout, "{}", response)?,
                Err(err) => writeln!(stdout, "error: {:#}", err)?,
            }
            stdout.flush()?;

            if let Some(reply) = self.await_ai() {
                write!(stdout, "{}", reply)?;
                stdout.flush()?;
            }
            line.clear();
        }
        Ok(())
    }

    pub fn handle_command(&mut self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(String::new());
        }

        match parts[0] {
            "mode" => self.handle_mode(&parts[1..]),
            "new" => {
                self.session.new_game();
                Ok(format!("{}\n", self.session.status_text()))
            }
            "select" => self.handle_select(&parts[1..]),
            "click" => self.handle_click(&parts[1..]),
            "move" => self.handle_move(&parts[1..]),
            "board" => Ok(self.render()),
            "status" => Ok(format!("{}\n", self.session.status_text())),
            "moves" => Ok(self.handle_moves()),
            "history" => Ok(self.handle_history()),
            "help" => Ok(HELP.to_string()),
            other => bail!("unknown command {:?}, try `help`", other),
        }
    }

    fn handle_mode(&mut self, parts: &[&str]) -> Result<String> {
        let mode = match parts.first().copied() {
            Some("1p") | Some("hvc") => GameMode::HumanVsComputer,
            Some("2p") | Some("hvh") => GameMode::HumanVsHuman,
            Some(other) => bail!("unknown mode {:?}", other),
            None => bail!("usage: mode 1p|2p"),
        };
        self.session.start_game(mode);
        Ok(self.render())
    }

    fn handle_select(&mut self, parts: &[&str]) -> Result<String> {
        let square = parse_square(parts.first().copied())?;
        match self.session.select_square(square) {
            Some(selection) => {
                let destinations: Vec<String> =
                    selection.destinations.iter().map(|s| s.to_string()).collect();
                Ok(format!("{} -> [{}]\n", selection.square, destinations.join(" ")))
            }
            None => Ok("selection cleared\n".to_string()),
        }
    }

    fn handle_click(&mut self, parts: &[&str]) -> Result<String> {
        let square = parse_square(parts.first().copied())?;
        let before = self.session.history().len();
        self.session.click_square(square);

        if self.session.history().len() == before {
            return Ok(match self.session.selection() {
                Some(selection) => format!("selected {}\n", selection.square),
                None => "selection cleared\n".to_string(),
            });
        }

        Ok(self.render())
    }

    fn handle_move(&mut self, parts: &[&str]) -> Result<String> {
        let (from, to) = match parts {
            [joined] if joined.len() == 4 => (
                parse_square(joined.get(0..2))?,
                parse_square(joined.get(2..4))?,
            ),
            [from, to] => (parse_square(Some(*from))?, parse_square(Some(*to))?),
            _ => bail!("usage: move <from> <to>"),
        };

        if self.session.attempt_move(from, to).is_none() {
            return Ok(format!("illegal move {}{}\n", from, to));
        }
        Ok(self.render())
    }

    fn handle_moves(&self) -> String {
        let moves: Vec<String> = self
            .session
            .legal_moves()
            .iter()
            .map(|mv| mv.to_string())
            .collect();
        format!("{}\n", moves.join(" "))
    }

    fn handle_history(&self) -> String {
        let moves: Vec<String> = self.session.history().iter().map(|mv| mv.to_string()).collect();
        format!("{}\n", moves.join(" "))
    }

    /// Sleeps out the think delay, plays the computer move and returns its
    /// report followed by the new board. `None` when no move is pending.
    pub fn await_ai(&mut self) -> Option<String> {
        let ticket = self.session.pending_ai()?;

        let now = Instant::now();
        if ticket.ready_at > now {
            thread::sleep(ticket.ready_at - now);
        }
        self.session.poll(ticket.ready_at.max(Instant::now()));

        let mut response = String::new();
        for line in self.ai_moves.borrow_mut().drain(..) {
            response.push_str(&line);
            response.push('\n');
        }
        response.push_str(&self.render());
        Some(response)
    }

    fn render(&self) -> String {
        format!("{}{}\n", self.session.get_board(), self.session.status_text())
    }
}

fn parse_square(text: Option<&str>) -> Result<Square> {
    let text = text.ok_or_else(|| anyhow!("missing square"))?;
    text.parse::<Square>()
        .with_context(|| format!("cannot read square {:?}", text))
}
