/// Dashboard `:commands` and autocomplete

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Bookings,
  Inventory,
  Staff,
  Suppliers,
  Services,
  Transactions,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub kind: CommandKind,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "bookings",
    aliases: &["b", "booking", "appointments"],
    description: "Upcoming and past appointments",
    kind: CommandKind::Bookings,
  },
  Command {
    name: "inventory",
    aliases: &["i", "inv", "stock"],
    description: "Stock levels",
    kind: CommandKind::Inventory,
  },
  Command {
    name: "staff",
    aliases: &["s", "staffs", "therapists"],
    description: "Staff members",
    kind: CommandKind::Staff,
  },
  Command {
    name: "suppliers",
    aliases: &["sup", "supplier", "vendors"],
    description: "Suppliers",
    kind: CommandKind::Suppliers,
  },
  Command {
    name: "services",
    aliases: &["svc", "service", "treatments"],
    description: "Treatments on offer",
    kind: CommandKind::Services,
  },
  Command {
    name: "transactions",
    aliases: &["t", "txn", "payments"],
    description: "Payments",
    kind: CommandKind::Transactions,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit spadesk",
    kind: CommandKind::Quit,
  },
];

/// Exact lookup by name or alias.
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let rank = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, rank));
  }

  // Stable, so ties keep table order
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("inventory");
    assert_eq!(suggestions[0].kind, CommandKind::Inventory);
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("txn")[0].kind, CommandKind::Transactions);
    assert_eq!(get_suggestions("inv")[0].kind, CommandKind::Inventory);
    assert_eq!(get_suggestions("q")[0].kind, CommandKind::Quit);
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("sup");
    assert_eq!(suggestions[0].kind, CommandKind::Suppliers);
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "s" is staff's alias and also a prefix of suppliers and services
    let suggestions = get_suggestions("s");
    assert_eq!(suggestions[0].kind, CommandKind::Staff);
    assert!(suggestions.len() > 1);
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ction");
    assert_eq!(suggestions[0].kind, CommandKind::Transactions);
  }

  #[test]
  fn test_find() {
    assert_eq!(find(" Bookings ").map(|c| c.kind), Some(CommandKind::Bookings));
    assert_eq!(find("svc").map(|c| c.kind), Some(CommandKind::Services));
    assert!(find("boards").is_none());
  }
}
