#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    ListFeeds,
    AddFeed(String),
    AddCsv(Vec<String>),
    RemoveFeed(i64),
    Force,
    PruneOlderThan(u32),
    Cleanup,
    Backup,
    ImportOpml(String),
}

/// Maps a message to a command.
///
/// `None` means the text is not a known command and is ignored. `Some(Err)`
/// carries the reply for a known command with bad arguments.
pub fn parse_command(text: &str) -> Option<Result<AdminCommand, String>> {
    let text = text.trim();
    let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let name = head.strip_prefix('/')?;
    // "/force@my_bot" in group chats
    let name = name.split('@').next().unwrap_or(name);
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match name {
        "urllist" => Ok(AdminCommand::ListFeeds),
        "force" => Ok(AdminCommand::Force),
        "dbcleanup" => Ok(AdminCommand::Cleanup),
        "sqlitebackup" => Ok(AdminCommand::Backup),
        "addfeed" => single_arg(&args).and_then(|url| {
            if url.contains("http") {
                Ok(AdminCommand::AddFeed(url.to_string()))
            } else {
                Err("Invalid URL format".to_string())
            }
        }),
        "rmfeed" => single_arg(&args).and_then(|id| {
            id.chars()
                .all(|c| c.is_ascii_digit())
                .then(|| id.parse().ok())
                .flatten()
                .map(AdminCommand::RemoveFeed)
                .ok_or_else(|| format!("[{}] is not a valid numeric index", id))
        }),
        "rmoldnews" => single_arg(&args).and_then(|days| {
            days.parse()
                .map(AdminCommand::PruneOlderThan)
                .map_err(|_| "Invalid number of days to delete".to_string())
        }),
        "importopml" => single_arg(&args).map(|url| AdminCommand::ImportOpml(url.to_string())),
        "addcsv" => {
            let urls: Vec<String> = rest
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
            if urls.len() > 1 {
                Ok(AdminCommand::AddCsv(urls))
            } else {
                Err("Expecting more than 1 value in CSV format".to_string())
            }
        }
        _ => return None,
    };
    Some(command)
}

fn single_arg<'a>(args: &[&'a str]) -> Result<&'a str, String> {
    match args {
        [arg] => Ok(*arg),
        _ => Err("Expecting only one argument".to_string()),
    }
}
